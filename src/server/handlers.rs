use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::db::GitTagAnnotation;
use crate::git_tags::{GitTagSource, ProjectRepo};
use crate::middleware::auth::RequireKeyAuth;
use crate::server::router::TagnoteState;
use crate::service::GitTagRow;
use crate::TagnoteError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnnotationBody {
    pub value: String,
}

pub async fn health() -> &'static str {
    "ok"
}

/// GET /git-tags/{project}/{repo} -> tag rows with annotations joined in.
pub async fn list_git_tags<S: GitTagSource>(
    _auth: RequireKeyAuth,
    State(state): State<TagnoteState<S>>,
    Path((project, repo)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<GitTagRow>>, TagnoteError> {
    let key = ProjectRepo::new(project, repo);
    let rows = state.table.rows(&key, query.refresh).await?;
    Ok(Json(rows))
}

/// GET /git-tag-annotations/{object_id}
pub async fn get_annotation<S: GitTagSource>(
    _auth: RequireKeyAuth,
    State(state): State<TagnoteState<S>>,
    Path(object_id): Path<String>,
) -> Result<Json<GitTagAnnotation>, TagnoteError> {
    let found = state.table.store().get(&object_id).await?;
    found
        .map(Json)
        .ok_or(TagnoteError::AnnotationNotFound(object_id))
}

/// PUT /git-tag-annotations/{object_id} with `{"value": "..."}`.
pub async fn put_annotation<S: GitTagSource>(
    _auth: RequireKeyAuth,
    State(state): State<TagnoteState<S>>,
    Path(object_id): Path<String>,
    Json(body): Json<AnnotationBody>,
) -> Result<Json<GitTagAnnotation>, TagnoteError> {
    let saved = state
        .table
        .submit_annotation(&object_id, &body.value)
        .await?;
    Ok(Json(saved))
}
