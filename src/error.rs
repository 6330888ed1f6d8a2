//! Error types for snapshot ingestion.

use thiserror::Error;

/// Reasons an incoming payload was rejected.
///
/// A rejected payload is discarded as a whole; the ingestor's known tree is
/// left exactly as it was before the payload arrived.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The payload is not valid JSON or does not match the wire schema.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed, but its top level is not a JSON object.
    #[error("Payload must be a JSON object")]
    NotAnObject,

    /// An application, service or instance was keyed by an empty string.
    #[error("Empty {kind} name under '{parent}'")]
    EmptyKey { kind: &'static str, parent: String },

    /// A newly seen entity is missing a field that has no previous value.
    #[error("Missing field '{field}' for new entity '{path}'")]
    MissingField { path: String, field: &'static str },

    /// A field carried a value outside its domain.
    #[error("Invalid value for '{field}' at '{path}': {reason}")]
    InvalidValue {
        path: String,
        field: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_entity() {
        let err = ParseError::MissingField {
            path: "shop/web/10.0.0.1:80".to_string(),
            field: "up",
        };
        assert_eq!(
            err.to_string(),
            "Missing field 'up' for new entity 'shop/web/10.0.0.1:80'"
        );

        let err = ParseError::EmptyKey {
            kind: "service",
            parent: "shop".to_string(),
        };
        assert_eq!(err.to_string(), "Empty service name under 'shop'");
    }

    #[test]
    fn test_from_serde_error() {
        let err: ParseError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ParseError::Malformed(_)));
        assert!(err.to_string().starts_with("Malformed payload"));
    }
}
