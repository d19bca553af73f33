//! Error types for contract and configuration failures.
//!
//! Input that fails a validation rule is never an error: it simply yields
//! `is_valid = false`. The variants here describe programming mistakes
//! (a collaborator that was never supplied, a field the form does not track)
//! and configuration documents that cannot be turned into brands.

use crate::resolve::FieldId;
use thiserror::Error;

/// Errors returned by builders, the configuration parser and the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required collaborator was not supplied at construction time.
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// The controller was asked to handle a field its session does not track.
    #[error("field {0} is not tracked by this validation session")]
    UntrackedField(FieldId),

    /// A brand pattern could not be compiled.
    #[error("invalid pan pattern for brand '{brand}': {reason}")]
    InvalidPattern {
        /// Name of the offending brand.
        brand: String,
        /// Compiler message from the regex engine.
        reason: String,
    },

    /// A brand record has an empty name.
    #[error("card brand is missing a name")]
    MissingBrandName,

    /// A PAN grouping contains a zero-sized group.
    #[error("pan grouping for brand '{0}' contains an empty group")]
    EmptyGroup(String),

    /// The configuration document could not be parsed at all.
    #[error("card configuration document could not be parsed: {0}")]
    Document(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::MissingCollaborator("validation listener").to_string(),
            "missing required collaborator: validation listener"
        );

        assert_eq!(
            Error::UntrackedField(FieldId::Pan).to_string(),
            "field pan is not tracked by this validation session"
        );

        assert_eq!(
            Error::InvalidPattern {
                brand: "visa".to_string(),
                reason: "unclosed group".to_string(),
            }
            .to_string(),
            "invalid pan pattern for brand 'visa': unclosed group"
        );

        assert_eq!(
            Error::Document("expected array".to_string()).to_string(),
            "card configuration document could not be parsed: expected array"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
