use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `git_tag_annotations`.
///
/// `updated_at` stays `None` until the row is written a second time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct GitTagAnnotation {
    #[serde(rename = "gitTagObjectId")]
    #[sqlx(rename = "gitTagObjectId")]
    pub git_tag_object_id: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
