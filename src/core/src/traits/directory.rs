//! Upstream directory fetch seam

use crate::types::DirectoryRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Upstream directory failures, split by retry eligibility
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Timeouts, 5xx responses, connection resets — safe to retry once
    #[error("Transient directory failure: {0}")]
    Transient(String),

    /// Unknown principal, revoked credentials, schema mismatch — retrying
    /// cannot help
    #[error("Directory failure: {0}")]
    Fatal(String),
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Transient(_))
    }
}

/// Fetches one principal's raw directory data
///
/// Implementations perform the actual network call to the identity provider;
/// the engine only depends on this seam.
#[async_trait]
pub trait DirectoryFetcher: Send + Sync {
    async fn fetch(&self, principal: &str) -> Result<DirectoryRecord, DirectoryError>;
}
