// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Document identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Store-native document identifier (simple-format UUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

/// Error for strings that are not id-shaped.
#[derive(Debug, thiserror::Error)]
#[error("Invalid id: {0}")]
pub struct InvalidId(pub String);

impl DocId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse any textual UUID form into the stored form.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        Uuid::try_parse(raw.trim())
            .map(|id| Self(id.simple().to_string()))
            .map_err(|_| InvalidId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&DocId> for serde_json::Value {
    fn from(id: &DocId) -> Self {
        serde_json::Value::String(id.0.clone())
    }
}
