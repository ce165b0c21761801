//! Failure taxonomy shared by every component.
//!
//! Raw failures are classified exactly once, where they happen: a deadline
//! that elapsed becomes `Timeout`, anything else becomes `Service` with the
//! original cause kept for diagnostics. Nothing downstream re-classifies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Cause of a `Service` failure
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The two kinds a caller can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A bounded wait was exceeded
    Timeout,

    /// Any other downstream failure
    Service,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Service => f.write_str("service"),
        }
    }
}

/// The outbound call a failure belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallSite {
    Reference { article_id: String },
    Image { url: String },
    Video { id: String },
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference { article_id } => write!(f, "reference '{}'", article_id),
            Self::Image { url } => write!(f, "image '{}'", url),
            Self::Video { id } => write!(f, "video '{}'", id),
        }
    }
}

/// Classified enrichment failure
///
/// Cloneable so every waiter on a shared fetch receives the same error.
#[derive(Debug, Clone, Error)]
pub enum EnrichError {
    #[error("{call} timed out after {}ms", .after.as_millis())]
    Timeout { call: CallSite, after: Duration },

    #[error("{call} failed: {source}")]
    Service {
        call: CallSite,
        #[source]
        source: Cause,
    },
}

impl EnrichError {
    /// Deadline exceeded on `call`
    pub fn timeout(call: CallSite, after: Duration) -> Self {
        Self::Timeout { call, after }
    }

    /// Downstream failure on `call`, keeping the provider's error chain
    pub fn service(call: CallSite, cause: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = cause.into();
        Self::Service {
            call,
            source: Arc::from(boxed),
        }
    }

    /// Failure of the task that was running the call (panic or shutdown)
    pub fn task(call: CallSite, err: tokio::task::JoinError) -> Self {
        Self::Service {
            call,
            source: Arc::new(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Service { .. } => ErrorKind::Service,
        }
    }

    /// The call that failed
    pub fn call(&self) -> &CallSite {
        match self {
            Self::Timeout { call, .. } | Self::Service { call, .. } => call,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

/// Result alias used across the engine
pub type EnrichResult<T> = std::result::Result<T, EnrichError>;
