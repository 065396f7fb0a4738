use std::future::Future;

use crate::error::TagnoteError;
use crate::git_tags::model::{GitTag, ProjectRepo};

/// Anything that can list the tags of one repository.
pub trait GitTagSource: Send + Sync + 'static {
    fn list_git_tags(
        &self,
        key: &ProjectRepo,
    ) -> impl Future<Output = Result<Vec<GitTag>, TagnoteError>> + Send;
}
