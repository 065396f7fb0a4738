use crate::config::AzureConfig;
use crate::error::TagnoteError;
use crate::git_tags::model::{GitTag, ProjectRepo};
use crate::git_tags::source::GitTagSource;
use backon::{ExponentialBuilder, Retryable};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const API_VERSION: &str = "6.0";
const TAG_REF_PREFIX: &str = "refs/tags/";

/// Git refs endpoint response, trimmed to what the tag table shows.
#[derive(Debug, Deserialize)]
struct RefsResponse {
    #[serde(default)]
    value: Vec<GitRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GitRef {
    name: String,
    object_id: String,
    #[serde(default)]
    peeled_object_id: Option<String>,
    #[serde(default)]
    creator: Option<IdentityRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRef {
    display_name: Option<String>,
}

/// Lists tags through the Azure DevOps Git REST API.
#[derive(Clone)]
pub struct AzureDevOpsClient {
    client: reqwest::Client,
    base_url: Url,
    organization: String,
    token: Option<String>,
    retry_max_times: usize,
}

impl AzureDevOpsClient {
    pub fn new(cfg: &AzureConfig) -> Result<Self, TagnoteError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("tagnote/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15));
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: cfg.base_url.clone(),
            organization: cfg.organization.clone(),
            token: cfg.token.clone(),
            retry_max_times: cfg.retry_max_times,
        })
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(self.retry_max_times)
            .with_jitter()
    }

    /// `{base}/{org}/{project}/_apis/git/repositories/{repo}/refs?filter=tags&peelTags=true`
    pub fn refs_url(&self, key: &ProjectRepo) -> Result<Url, TagnoteError> {
        let mut url = with_segments(
            &self.base_url,
            &[
                self.organization.as_str(),
                key.project.as_str(),
                "_apis",
                "git",
                "repositories",
                key.repo.as_str(),
                "refs",
            ],
        )?;
        url.query_pairs_mut()
            .append_pair("filter", "tags")
            .append_pair("peelTags", "true")
            .append_pair("api-version", API_VERSION);
        Ok(url)
    }

    /// Browser URL of the repository, used to build tag and commit links.
    pub fn repo_web_url(&self, key: &ProjectRepo) -> Result<Url, TagnoteError> {
        with_segments(
            &self.base_url,
            &[
                self.organization.as_str(),
                key.project.as_str(),
                "_git",
                key.repo.as_str(),
            ],
        )
    }

    async fn fetch_refs(&self, url: &Url) -> Result<Vec<u8>, TagnoteError> {
        let client = &self.client;
        let token = self.token.as_deref();

        let resp = (|| async move {
            let mut req = client.get(url.clone()).header(ACCEPT, "application/json");
            if let Some(token) = token {
                req = req.basic_auth("", Some(token));
            }
            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(TagnoteError::UpstreamStatus(status));
            }
            Ok(resp)
        })
        .retry(self.retry_policy())
        .when(TagnoteError::is_retryable)
        .notify(|err, dur| {
            warn!(error = %err, retry_in = ?dur, "Azure DevOps request failed; retrying");
        })
        .await?;

        Ok(resp.bytes().await?.to_vec())
    }
}

impl GitTagSource for AzureDevOpsClient {
    async fn list_git_tags(&self, key: &ProjectRepo) -> Result<Vec<GitTag>, TagnoteError> {
        let url = self.refs_url(key)?;
        let body = self.fetch_refs(&url).await?;
        let tags = tags_from_refs(&self.repo_web_url(key)?, &body)?;
        debug!(repo = %key, count = tags.len(), "fetched git tags");
        Ok(tags)
    }
}

fn with_segments(base: &Url, segments: &[&str]) -> Result<Url, TagnoteError> {
    let mut joined = base.clone();
    joined
        .path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(joined)
}

/// Map a refs response body to tags, linking each into the repository web UI.
fn tags_from_refs(web_url: &Url, body: &[u8]) -> Result<Vec<GitTag>, TagnoteError> {
    let refs: RefsResponse = serde_json::from_slice(body)?;
    let tags = refs
        .value
        .into_iter()
        .map(|r| {
            let name = r
                .name
                .strip_prefix(TAG_REF_PREFIX)
                .unwrap_or(&r.name)
                .to_string();

            let mut link = web_url.clone();
            link.query_pairs_mut()
                .append_pair("version", &format!("GT{name}"));

            let commit_link = r.peeled_object_id.as_deref().and_then(|commit| {
                with_segments(web_url, &["commit", commit])
                    .ok()
                    .map(String::from)
            });

            GitTag {
                object_id: r.object_id,
                peeled_object_id: r.peeled_object_id,
                name,
                created_by: r.creator.and_then(|c| c.display_name),
                link: link.into(),
                commit_link,
            }
        })
        .collect();
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AzureDevOpsClient {
        let cfg = AzureConfig {
            organization: "acme".to_string(),
            ..AzureConfig::default()
        };
        AzureDevOpsClient::new(&cfg).expect("client builds")
    }

    #[test]
    fn refs_url_targets_tag_refs() {
        let url = client()
            .refs_url(&ProjectRepo::new("Platform", "web app"))
            .expect("url");
        assert_eq!(url.path(), "/acme/Platform/_apis/git/repositories/web%20app/refs");
        assert_eq!(
            url.query(),
            Some("filter=tags&peelTags=true&api-version=6.0")
        );
    }

    #[test]
    fn maps_refs_to_linked_tags() {
        let web = client()
            .repo_web_url(&ProjectRepo::new("Platform", "web"))
            .expect("url");
        let body = br#"{
            "count": 2,
            "value": [
                {
                    "name": "refs/tags/v1.2.0",
                    "objectId": "aaa2f645ec987a60980a819e3f7aaa93d942cc3c",
                    "peeledObjectId": "9f0c1e2d",
                    "creator": { "displayName": "Jane Doe" }
                },
                {
                    "name": "refs/tags/lightweight",
                    "objectId": "295f8050d35435f27cb431cffd815204dc6cd3ea"
                }
            ]
        }"#;

        let tags = tags_from_refs(&web, body).expect("parse");
        assert_eq!(tags.len(), 2);

        assert_eq!(tags[0].name, "v1.2.0");
        assert_eq!(tags[0].created_by.as_deref(), Some("Jane Doe"));
        assert_eq!(
            tags[0].link,
            "https://dev.azure.com/acme/Platform/_git/web?version=GTv1.2.0"
        );
        assert_eq!(
            tags[0].commit_link.as_deref(),
            Some("https://dev.azure.com/acme/Platform/_git/web/commit/9f0c1e2d")
        );

        assert_eq!(tags[1].name, "lightweight");
        assert!(tags[1].peeled_object_id.is_none());
        assert!(tags[1].commit_link.is_none());
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let web = Url::parse("https://dev.azure.com/acme/p/_git/r").expect("url");
        let err = tags_from_refs(&web, b"<html>").expect_err("must fail");
        assert!(matches!(err, TagnoteError::Json(_)));
    }
}
