//! # Correlation Context
//!
//! Explicit request correlation across service boundaries. A correlation id
//! is captured once at the edge (or generated when absent) and handed to
//! every outbound call and published message from that request. There is no
//! thread-local or task-local propagation: anything that needs the id takes
//! it as an argument.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation identifier for a single inbound request.
///
/// Carried on outbound HTTP calls and published messages as the
/// `X-CorrelationID` header so that logs from the advertisements service,
/// the user service, and the statistics consumer can be joined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh correlation id for a request that arrived without one
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt an id received from upstream.
    ///
    /// Returns `None` for an empty value; the caller should then generate a
    /// fresh id instead of propagating the empty string.
    pub fn from_header(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Adopt the upstream id when present, otherwise generate a fresh one
    pub fn inherit_or_generate(value: Option<&str>) -> Self {
        value
            .and_then(Self::from_header)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }

    #[test]
    fn test_from_header_rejects_blank_values() {
        assert!(CorrelationId::from_header("").is_none());
        assert!(CorrelationId::from_header("   ").is_none());

        let id = CorrelationId::from_header("  abc-123  ");
        assert_eq!(id.map(|id| id.as_str().to_string()), Some("abc-123".into()));
    }

    #[test]
    fn test_inherit_or_generate() {
        let inherited = CorrelationId::inherit_or_generate(Some("upstream-id"));
        assert_eq!(inherited.as_str(), "upstream-id");

        let generated = CorrelationId::inherit_or_generate(None);
        assert!(!generated.as_str().is_empty());
    }
}
