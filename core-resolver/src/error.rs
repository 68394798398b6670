//! # Resolver Error Types
//!
//! Errors raised inside lookups. They never escape [`resolve`]: the resolver
//! logs them and falls back to an empty or unchanged value.
//!
//! [`resolve`]: crate::VideoUrlResolver::resolve

use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    /// The blob store has no payload under the key.
    #[error("No stored video for key '{0}'")]
    BlobMissing(String),

    /// Reading the blob store failed.
    #[error("Failed to read stored video '{key}': {source}")]
    BlobRead {
        key: String,
        #[source]
        source: BridgeError,
    },

    /// The object URL factory refused the payload.
    #[error("Failed to materialize stored video '{key}': {source}")]
    Materialize {
        key: String,
        #[source]
        source: BridgeError,
    },

    /// The record store lookup failed.
    #[error("Record store lookup failed: {0}")]
    Store(#[from] BridgeError),

    /// Lookups succeeded but produced nothing better than the current value.
    #[error("No fresher URL found for '{0}'")]
    NoFresherUrl(String),

    /// The cache was cleared while the lookup was running.
    #[error("Cache cleared during lookup")]
    Superseded,
}

impl ResolverError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ResolverError::Store(_) | ResolverError::BlobRead { .. } => true,
            ResolverError::NoFresherUrl(_) | ResolverError::Superseded => true,
            ResolverError::BlobMissing(_) | ResolverError::Materialize { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_mention_key() {
        let err = ResolverError::BlobMissing("vid123".to_string());
        assert!(err.to_string().contains("vid123"));

        let err = ResolverError::Materialize {
            key: "vid9".to_string(),
            source: BridgeError::BlobError("quota".to_string()),
        };
        assert!(err.to_string().contains("vid9"));
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ResolverError::Store(BridgeError::OperationFailed("503".into())).is_transient());
        assert!(!ResolverError::BlobMissing("k".into()).is_transient());
    }
}
