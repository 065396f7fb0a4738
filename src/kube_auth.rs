//! Request-body decoration for Kubernetes cluster calls authenticated with OIDC.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;

use crate::error::TagnoteError;

/// Credentials forwarded alongside a Kubernetes request, keyed by auth scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubernetesRequestAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<String>,
    /// OIDC id tokens keyed by provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubernetesRequestBody {
    #[serde(default)]
    pub auth: KubernetesRequestAuth,
    #[serde(default)]
    pub entity: Value,
}

/// Source of OpenID Connect id tokens for the signed-in user.
pub trait IdTokenProvider: Send + Sync {
    fn id_token(&self) -> impl Future<Output = Result<String, TagnoteError>> + Send;
}

pub trait KubernetesAuthProvider: Send + Sync {
    fn decorate_request_body_for_auth(
        &self,
        body: KubernetesRequestBody,
    ) -> impl Future<Output = Result<KubernetesRequestBody, TagnoteError>> + Send;
}

pub struct OidcKubernetesAuthProvider<P> {
    provider_name: String,
    auth_provider: P,
}

impl<P: IdTokenProvider> OidcKubernetesAuthProvider<P> {
    pub fn new(provider_name: impl Into<String>, auth_provider: P) -> Self {
        Self {
            provider_name: provider_name.into(),
            auth_provider,
        }
    }
}

impl<P: IdTokenProvider> KubernetesAuthProvider for OidcKubernetesAuthProvider<P> {
    async fn decorate_request_body_for_auth(
        &self,
        mut body: KubernetesRequestBody,
    ) -> Result<KubernetesRequestBody, TagnoteError> {
        let token = self.auth_provider.id_token().await?;
        body.auth
            .oidc
            .get_or_insert_with(BTreeMap::new)
            .insert(self.provider_name.clone(), token);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticToken(&'static str);

    impl IdTokenProvider for StaticToken {
        async fn id_token(&self) -> Result<String, TagnoteError> {
            Ok(self.0.to_string())
        }
    }

    struct NoSession;

    impl IdTokenProvider for NoSession {
        async fn id_token(&self) -> Result<String, TagnoteError> {
            Err(TagnoteError::IdToken("user is not signed in".to_string()))
        }
    }

    #[tokio::test]
    async fn creates_oidc_map_when_absent() {
        let provider = OidcKubernetesAuthProvider::new("okta", StaticToken("tok"));
        let body = KubernetesRequestBody {
            auth: KubernetesRequestAuth::default(),
            entity: json!({"metadata": {"name": "svc"}}),
        };

        let out = provider
            .decorate_request_body_for_auth(body)
            .await
            .expect("decorate");

        let oidc = out.auth.oidc.expect("oidc map");
        assert_eq!(oidc.get("okta").map(String::as_str), Some("tok"));
        assert_eq!(out.entity, json!({"metadata": {"name": "svc"}}));
    }

    #[tokio::test]
    async fn keeps_other_providers_and_google_token() {
        let provider = OidcKubernetesAuthProvider::new("okta", StaticToken("new"));
        let body: KubernetesRequestBody = serde_json::from_value(json!({
            "auth": {
                "google": "g-token",
                "oidc": { "gitlab": "gl-token", "okta": "old" }
            },
            "entity": {}
        }))
        .expect("body");

        let out = provider
            .decorate_request_body_for_auth(body)
            .await
            .expect("decorate");

        assert_eq!(out.auth.google.as_deref(), Some("g-token"));
        let oidc = out.auth.oidc.expect("oidc map");
        assert_eq!(oidc.len(), 2);
        assert_eq!(oidc["gitlab"], "gl-token");
        assert_eq!(oidc["okta"], "new");
    }

    #[tokio::test]
    async fn token_failure_propagates() {
        let provider = OidcKubernetesAuthProvider::new("okta", NoSession);
        let err = provider
            .decorate_request_body_for_auth(KubernetesRequestBody::default())
            .await
            .expect_err("must fail");
        assert!(matches!(err, TagnoteError::IdToken(_)));
    }
}
