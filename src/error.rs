/// Error types for the BioRemPP pipeline
///
/// Two layers:
/// - `TableError` is raised by table primitives (column lookup, row access, typing).
/// - `Error` is the pipeline taxonomy surfaced to callers. Table primitive failures
///   that escape a join or an aggregation are wrapped as `Error::Processing`.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by format and processing errors
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised by `Table`, `Column` and `Schema` operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Row {row} out of range [0, {len})")]
    RowOutOfRange { row: usize, len: usize },
    #[error("Type mismatch in column '{column}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("Column '{0}' is not nullable")]
    NotNullable(String),
    #[error("Missing value for column '{0}'")]
    MissingValue(String),
    #[error("Row has {found} values, schema has {expected} columns")]
    RowWidth { expected: usize, found: usize },
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// Pipeline error taxonomy
#[derive(Debug, Error)]
pub enum Error {
    /// A file the pipeline was asked to read does not exist
    #[error("File not found: {}", path.display())]
    FileAccess { path: PathBuf },

    /// Malformed input text, unsupported extension, or unreadable file
    #[error("{message}")]
    Format {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Required columns absent from a table at a component boundary
    #[error("Missing required columns in '{table}': {}", missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    /// Too few observations for a computation that compares them
    #[error("{context}: need at least {needed}, got {found}")]
    InsufficientData {
        context: String,
        needed: usize,
        found: usize,
    },

    /// Unexpected failure inside a join or grouping step
    #[error("{context}: {source}")]
    Processing {
        context: String,
        #[source]
        source: BoxedCause,
    },
}

impl Error {
    pub fn format(message: impl Into<String>) -> Self {
        Error::Format {
            message: message.into(),
            source: None,
        }
    }

    pub fn format_with<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Format {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn schema(table: impl Into<String>, missing: Vec<String>) -> Self {
        Error::Schema {
            table: table.into(),
            missing,
        }
    }

    pub fn processing<E>(context: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Processing {
            context: context.into(),
            source: Box::new(cause),
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Adapter wrapping a table primitive failure as `Error::Processing`.
/// The wrapped error is logged before it is returned.
pub(crate) fn processing_failure(context: impl Into<String>) -> impl FnOnce(TableError) -> Error {
    let context = context.into();
    move |e| {
        let err = Error::processing(context, e);
        log::error!("{}", err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_schema_error_names_every_column() {
        let err = Error::schema("enriched", vec!["Gene".to_string(), "Pathway".to_string()]);
        let message = err.to_string();
        assert!(message.contains("Gene"));
        assert!(message.contains("Pathway"));
        assert!(message.contains("enriched"));
        assert!(err.is_schema());
    }

    #[test]
    fn test_processing_error_keeps_cause() {
        let cause = TableError::ColumnNotFound("ko".to_string());
        let err = Error::processing("gene sample counts", cause.clone());
        assert!(err.to_string().contains("Column 'ko' not found"));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_format_error_message_is_verbatim() {
        let err = Error::format("Invalid format at line 3: 'foo'");
        assert_eq!(err.to_string(), "Invalid format at line 3: 'foo'");
        assert!(err.is_format());
        assert!(err.source().is_none());
    }
}
