//! Fetch client seam and per-key outcome type

use crate::keys::Key;
use crate::HarvestError;
use async_trait::async_trait;

/// Result of fetching one key
///
/// Both variants carry the key they were requested with and the query string
/// derived from it, so every outcome can be correlated back to its input.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<R> {
    /// The lookup succeeded
    Success {
        key: Key,
        query: String,
        record: R,
    },

    /// The lookup failed after retries, or with a non-retryable error
    Failure {
        key: Key,
        query: String,
        /// Human-readable description, never empty
        error: String,
    },
}

impl<R> FetchOutcome<R> {
    pub fn success(key: Key, query: String, record: R) -> Self {
        Self::Success { key, query, record }
    }

    /// Creates a failure record; a blank description is replaced with "unknown error"
    pub fn failure(key: Key, query: String, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".to_string();
        }
        Self::Failure { key, query, error }
    }

    pub fn key(&self) -> &Key {
        match self {
            Self::Success { key, .. } | Self::Failure { key, .. } => key,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Success { query, .. } | Self::Failure { query, .. } => query,
        }
    }

    pub fn record(&self) -> Option<&R> {
        match self {
            Self::Success { record, .. } => Some(record),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// A component that performs one resilient lookup per key
///
/// Implementations own their retry behavior. `fetch` must always produce an
/// outcome: every error is folded into [`FetchOutcome::Failure`].
///
/// Each worker of the [`BoundedMapper`](crate::fetch::BoundedMapper) opens
/// its own `Session` before its first fetch and keeps it until the worker
/// exits. Sessions are never shared between workers.
#[async_trait]
pub trait FetchClient: Send + Sync + 'static {
    /// Worker-scoped resource, typically a connection pool
    type Session: Send + Sync + 'static;

    /// Data extracted from a successful lookup
    type Record: Send + 'static;

    /// Creates a session for one worker
    fn open_session(&self) -> Result<Self::Session, HarvestError>;

    /// Builds the query string sent upstream for a key
    fn query_for(&self, key: &Key) -> String;

    /// Fetches one key
    async fn fetch(&self, session: &Self::Session, key: &Key) -> FetchOutcome<Self::Record>;
}
