use axum::{Router, routing::get};
use std::sync::Arc;

use crate::git_tags::GitTagSource;
use crate::server::handlers::{get_annotation, health, list_git_tags, put_annotation};
use crate::service::GitTagTable;

/// Shared state handed to every handler.
pub struct TagnoteState<S> {
    pub table: Arc<GitTagTable<S>>,
    pub tagnote_key: Arc<str>,
}

impl<S> Clone for TagnoteState<S> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            tagnote_key: Arc::clone(&self.tagnote_key),
        }
    }
}

impl<S: GitTagSource> TagnoteState<S> {
    pub fn new(table: GitTagTable<S>, tagnote_key: Arc<str>) -> Self {
        Self {
            table: Arc::new(table),
            tagnote_key,
        }
    }
}

pub fn tagnote_router<S: GitTagSource>(state: TagnoteState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/git-tags/{project}/{repo}", get(list_git_tags::<S>))
        .route(
            "/git-tag-annotations/{object_id}",
            get(get_annotation::<S>).put(put_annotation::<S>),
        )
        .with_state(state)
}
