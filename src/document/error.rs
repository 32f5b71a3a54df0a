//! Error types for the structured-document codec.

use thiserror::Error;

/// Errors raised while parsing or serializing a structured document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input is not a valid document (bad YAML or wrong shape).
    #[error("invalid structured document: {source}")]
    Parse {
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The document could not be written as YAML.
    #[error("failed to serialize structured document: {source}")]
    Serialize {
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_includes_yaml_reason() {
        let Err(source) = serde_yaml::from_str::<Vec<u8>>("{not: [a list") else {
            panic!("expected YAML error");
        };
        let err = DocumentError::Parse { source };
        assert!(err.to_string().starts_with("invalid structured document:"));
    }
}
