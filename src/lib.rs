pub mod config;
pub mod db;
pub mod error;
pub mod git_tags;
pub mod kube_auth;
pub mod middleware;
pub mod server;
pub mod service;

pub use db::{AnnotationStore, GitTagAnnotation};
pub use error::TagnoteError;
