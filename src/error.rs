use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TagnoteError {
    /// Schema setup failed while constructing the store. Never retried.
    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),

    /// A read or write against the backing database failed.
    #[error("Database error: {0}")]
    Persistence(#[from] SqlxError),

    #[error("git tag object id must not be empty")]
    EmptyObjectId,

    #[error("No annotation stored for git tag {0}")]
    AnnotationNotFound(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("ID token error: {0}")]
    IdToken(String),
}

impl TagnoteError {
    /// Transient upstream failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TagnoteError::Reqwest(e) => e.is_timeout() || e.is_connect(),
            TagnoteError::UpstreamStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<figment::Error> for TagnoteError {
    fn from(e: figment::Error) -> Self {
        TagnoteError::Config(Box::new(e))
    }
}

impl IntoResponse for TagnoteError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            TagnoteError::Persistence(_)
            | TagnoteError::Migration(_)
            | TagnoteError::Io(_)
            | TagnoteError::Config(_)
            | TagnoteError::IdToken(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
            TagnoteError::EmptyObjectId => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: self.to_string(),
                };
                (status, body)
            }
            TagnoteError::AnnotationNotFound(_) => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: self.to_string(),
                };
                (status, body)
            }
            TagnoteError::Reqwest(_) | TagnoteError::UrlParse(_) => {
                let status = StatusCode::BAD_GATEWAY;
                let body = ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Azure DevOps is unavailable.".to_string(),
                };
                (status, body)
            }
            TagnoteError::Json(_) => {
                let status = StatusCode::BAD_GATEWAY;
                let body = ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Azure DevOps returned an unexpected response.".to_string(),
                };
                (status, body)
            }
            TagnoteError::UpstreamStatus(code) => {
                let (err_code, msg) = match code {
                    StatusCode::TOO_MANY_REQUESTS => {
                        ("RATE_LIMIT", "Azure DevOps rate limit exceeded.")
                    }
                    StatusCode::UNAUTHORIZED => {
                        ("UNAUTHORIZED", "Azure DevOps authentication failed.")
                    }
                    StatusCode::FORBIDDEN => ("FORBIDDEN", "Azure DevOps permission denied."),
                    StatusCode::NOT_FOUND => ("NOT_FOUND", "Project or repository not found."),
                    _ => ("UPSTREAM_ERROR", "An upstream error occurred."),
                };

                (
                    code,
                    ApiErrorBody {
                        code: err_code.to_string(),
                        message: msg.to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: TagnoteError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[tokio::test]
    async fn malformed_upstream_body_is_not_reported_as_an_outage() {
        let parse_err = serde_json::from_slice::<Value>(b"<html>").expect_err("not json");
        let (status, body) = render(TagnoteError::Json(parse_err)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert_eq!(
            body["error"]["message"],
            "Azure DevOps returned an unexpected response."
        );
    }

    #[tokio::test]
    async fn persistence_failures_hide_details() {
        let (status, body) = render(TagnoteError::Persistence(sqlx::Error::PoolTimedOut)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    }
}
