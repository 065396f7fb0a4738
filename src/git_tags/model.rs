use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key: an Azure DevOps project and one of its repositories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRepo {
    pub project: String,
    pub repo: String,
}

impl ProjectRepo {
    pub fn new(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for ProjectRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.repo)
    }
}

/// An annotated git tag as shown in the tag table.
///
/// `object_id` is the tag object itself and keys the annotation store;
/// `peeled_object_id` is the commit the tag points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitTag {
    pub object_id: String,
    pub peeled_object_id: Option<String>,
    pub name: String,
    pub created_by: Option<String>,
    pub link: String,
    pub commit_link: Option<String>,
}
