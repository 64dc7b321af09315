//! Common types used throughout pagestream
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Property names kept by a projection query. Empty means "whole record".
pub type Projection = Vec<String>;

// ============================================================================
// Cursor
// ============================================================================

/// Opaque, service-issued position in a result stream
///
/// Serializes as a web-safe base64 string so it can round-trip through
/// URLs, JSON bodies and config files.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cursor(Vec<u8>);

impl Cursor {
    /// Create a cursor from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw cursor bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode as a web-safe string
    pub fn to_websafe_string(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Decode a web-safe string produced by [`Cursor::to_websafe_string`]
    pub fn from_websafe_string(encoded: &str) -> Result<Self> {
        URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| Error::invalid_cursor(format!("'{encoded}': {e}")))
    }

    /// True if the cursor carries no position bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.to_websafe_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_websafe_string())
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_websafe_string())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Cursor::from_websafe_string(&encoded).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Fetch Count
// ============================================================================

/// How many records a single load call should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchCount {
    /// At least one record, or confirmation that the query is exhausted
    #[default]
    Unbounded,
    /// Up to this many records beyond any offset still to be skipped
    Exactly(usize),
}

impl FetchCount {
    /// Minimum number of new records a load must produce before it may stop
    pub fn minimum(self) -> usize {
        match self {
            FetchCount::Unbounded => 1,
            FetchCount::Exactly(n) => n,
        }
    }

    /// The requested count, if one was given
    pub fn requested(self) -> Option<usize> {
        match self {
            FetchCount::Unbounded => None,
            FetchCount::Exactly(n) => Some(n),
        }
    }

    /// True for `Exactly(0)`
    pub fn is_zero(self) -> bool {
        self == FetchCount::Exactly(0)
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Records that can be narrowed to a projection
pub trait Projectable: Sized {
    /// Keep only the projected properties. The default keeps everything.
    #[must_use]
    fn project(self, projection: &[String]) -> Self {
        let _ = projection;
        self
    }
}

impl Projectable for JsonValue {
    fn project(self, projection: &[String]) -> Self {
        if projection.is_empty() {
            return self;
        }
        match self {
            JsonValue::Object(map) => JsonValue::Object(
                map.into_iter()
                    .filter(|(key, _)| projection.iter().any(|p| p == key))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl Projectable for String {}

// ============================================================================
// Transaction Context
// ============================================================================

/// Transaction the query runs in, handed to post-load hooks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Service-issued transaction handle, if the query is transactional
    pub transaction_id: Option<String>,
}

impl TransactionContext {
    /// Context for a query outside any transaction
    pub fn none() -> Self {
        Self::default()
    }

    /// Context for a query inside the given transaction
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            transaction_id: Some(id.into()),
        }
    }

    /// Whether a transaction is active
    pub fn is_active(&self) -> bool {
        self.transaction_id.is_some()
    }
}
