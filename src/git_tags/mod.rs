//! Git tags listed from Azure Repos and the shared list cache in front of them.

pub mod azure;
pub mod cache;
pub mod model;
pub mod source;

pub use azure::AzureDevOpsClient;
pub use cache::GitTagListCache;
pub use model::{GitTag, ProjectRepo};
pub use source::GitTagSource;
