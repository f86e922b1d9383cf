//! Canonical wire description of a non-successful outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Describes why an operation or a request did not succeed.
///
/// Independent of transport status codes. Also usable directly as an
/// application error: the default failure codec keeps its metadata intact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct Failure {
    /// Human-readable description.
    pub message: String,
    /// Optional structured key/value context. `BTreeMap` for deterministic output.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, String>,
}

impl Failure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
