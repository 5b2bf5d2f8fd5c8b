//! Error types for the docrefit library.

use std::io;
use thiserror::Error;

/// Result type alias for docrefit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while refitting documents.
///
/// Errors scoped to a single document — a file that is not a zip, a zip
/// with malformed inner XML, a missing required part — are recoverable at
/// the batch level: the file is skipped and reported while the rest of the
/// batch proceeds. Configuration errors are raised once, before any
/// document is processed.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The YAML configuration is syntactically invalid.
    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration is well-formed YAML but semantically unusable,
    /// e.g. a find/replace pattern that does not compile.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single input is not a valid/openable DOCX package. The batch
    /// orchestrator catches this per file without aborting the run.
    #[error("Composition error: {0}")]
    Composition(String),

    /// The package opened, but a required part is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// A package part exists but is structurally malformed.
    #[error("Malformed package part: {0}")]
    Package(String),

    /// Error reading or writing a zip container.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Error parsing or serializing WordprocessingML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error is scoped to a single document, so the batch
    /// orchestrator may skip the offending file and continue with the
    /// rest of the batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Composition(_) | Error::Package(_) | Error::MissingPart(_) | Error::Xml(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Composition("not a DOCX package".to_string());
        assert_eq!(err.to_string(), "Composition error: not a DOCX package");

        let err = Error::MissingPart("word/document.xml".to_string());
        assert_eq!(err.to_string(), "Missing package part: word/document.xml");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::Composition("bad file".into()).is_recoverable());
        assert!(Error::Package("malformed document.xml".into()).is_recoverable());
        assert!(Error::MissingPart("word/document.xml".into()).is_recoverable());
        assert!(!Error::Config("bad regex".into()).is_recoverable());
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        assert!(!Error::from(io_err).is_recoverable());
    }
}
