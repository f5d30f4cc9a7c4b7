//! Share-link resolution
//!
//! Turns a public share link into a [`FileDescriptor`] by querying the
//! third-party resolver API. Rate limiting and transport failures are
//! retried with exponential backoff; anything else is definitive.

mod client;
mod error;
mod models;

use async_trait::async_trait;

pub use client::ResolverClient;
pub use error::ResolveError;
pub use models::{FileDescriptor, ResolverResponse, UNKNOWN_FILE_NAME};

/// Resolves share links to direct download metadata
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, link: &str) -> Result<FileDescriptor, ResolveError>;
}
