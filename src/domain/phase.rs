//! Lifecycle of a single enrichment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of one `enrich()` invocation
///
/// `Pending -> ResolvingReference -> FetchingAssets -> Complete | Failed`.
/// `Failed` can be entered from either working phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichPhase {
    #[default]
    Pending,
    ResolvingReference,
    FetchingAssets,
    Complete,
    Failed,
}

impl EnrichPhase {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Next phase on success of the current one
    pub fn advance(self) -> Self {
        match self {
            Self::Pending => Self::ResolvingReference,
            Self::ResolvingReference => Self::FetchingAssets,
            Self::FetchingAssets => Self::Complete,
            terminal => terminal,
        }
    }

    /// Phase after a failure in the current one
    pub fn fail(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for EnrichPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::ResolvingReference => "resolving_reference",
            Self::FetchingAssets => "fetching_assets",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
