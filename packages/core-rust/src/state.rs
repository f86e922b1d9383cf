//! Operation lifecycle states.
//!
//! ```text
//! Pending -> Running -> Succeeded | Failed | Canceled
//! Pending -----------> Succeeded | Failed | Canceled
//! ```
//!
//! Terminal states never transition. A cancel request racing a natural
//! completion is not arbitrated here: whichever terminal state a handler
//! reports first is the state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an operation, serialized in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    /// Accepted but not yet observed to make progress.
    Pending,
    /// Progress reported by the execution substrate. Non-terminal.
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    /// Returns `true` for `Succeeded`, `Failed` and `Canceled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Whether a report of `next` may follow a report of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => !matches!(next, Self::Pending),
            Self::Running => next.is_terminal(),
            Self::Succeeded | Self::Failed | Self::Canceled => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`OperationState`] from its wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation state: {0}")]
pub struct UnknownOperationState(pub String);

impl FromStr for OperationState {
    type Err = UnknownOperationState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            other => Err(UnknownOperationState(other.to_string())),
        }
    }
}

/// Identity and state of an asynchronous operation instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// The operation token.
    pub id: String,
    pub state: OperationState,
}

impl OperationInfo {
    #[must_use]
    pub fn new(id: impl Into<String>, state: OperationState) -> Self {
        Self {
            id: id.into(),
            state,
        }
    }
}
