use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::{AnnotationStore, GitTagAnnotation};
use crate::error::TagnoteError;
use crate::git_tags::{GitTag, GitTagListCache, GitTagSource, ProjectRepo};

/// One table row: a tag plus its annotation, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitTagRow {
    #[serde(flatten)]
    pub tag: GitTag,
    pub annotation: Option<String>,
}

/// The git tag table: tags from an injected cache joined with stored annotations.
///
/// Edits go through [`GitTagTable::submit_annotation`] only.
pub struct GitTagTable<S> {
    tags: Arc<GitTagListCache<S>>,
    store: AnnotationStore,
}

impl<S: GitTagSource> GitTagTable<S> {
    pub fn new(tags: Arc<GitTagListCache<S>>, store: AnnotationStore) -> Self {
        Self { tags, store }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Rows for `key`, sorted by tag name descending. `refresh` bypasses the cache.
    pub async fn rows(
        &self,
        key: &ProjectRepo,
        refresh: bool,
    ) -> Result<Vec<GitTagRow>, TagnoteError> {
        let tags = if refresh {
            self.tags.refresh(key).await?
        } else {
            self.tags.get(key).await?
        };

        let ids: Vec<String> = tags.iter().map(|t| t.object_id.clone()).collect();
        let annotations = self.store.get_many(&ids).await?;

        let mut rows: Vec<GitTagRow> = tags
            .iter()
            .map(|tag| GitTagRow {
                annotation: annotations.get(&tag.object_id).map(|a| a.value.clone()),
                tag: tag.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.tag.name.cmp(&a.tag.name));
        Ok(rows)
    }

    /// Store `value` for the tag object and return the persisted record.
    pub async fn submit_annotation(
        &self,
        object_id: &str,
        value: &str,
    ) -> Result<GitTagAnnotation, TagnoteError> {
        self.store.store(object_id, value).await?;
        let saved = self
            .store
            .get(object_id)
            .await?
            .ok_or_else(|| TagnoteError::AnnotationNotFound(object_id.to_string()))?;
        info!(object_id, updated = saved.updated_at.is_some(), "annotation saved");
        Ok(saved)
    }
}
