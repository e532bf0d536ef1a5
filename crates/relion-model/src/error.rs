//! Error types for STAR table operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::value::CastError;

/// Errors raised by table operations, the text codec, and the particle
/// algorithms. Every variant names the operation that failed.
#[derive(Debug, Error)]
pub enum StarError {
    /// Column name not recognized by the label catalogue.
    #[error("{op}: column name not recognized: {name}")]
    Schema { op: &'static str, name: String },

    /// Bulk column assignment with the wrong number of values.
    #[error("{op}: column '{name}' given {actual} values, table has {expected} rows")]
    LengthMismatch {
        op: &'static str,
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Row insertion with the wrong number of values.
    #[error("{op}: row has {actual} values, table has {expected} columns")]
    ColumnCount {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Reference to a column that does not exist.
    #[error("{op}: no column named '{name}'")]
    UnknownColumn { op: &'static str, name: String },

    /// Row index past the end of the table.
    #[error("{op}: row {row} out of range for table with {nrows} rows")]
    RowOutOfRange {
        op: &'static str,
        row: usize,
        nrows: usize,
    },

    /// Malformed serialized content or an uncastable value.
    #[error("{op}: {message}")]
    Format { op: &'static str, message: String },

    /// Equality lookup with no matching row.
    #[error("{op}: no row where column '{name}' equals '{value}'")]
    NotFound {
        op: &'static str,
        name: String,
        value: String,
    },

    /// Bulk algorithm precondition column is absent.
    #[error("{op}: required column '{name}' is missing")]
    MissingColumn { op: &'static str, name: String },

    /// Caller-supplied argument outside the operation contract.
    #[error("{op}: {message}")]
    InvalidArgument { op: &'static str, message: String },

    /// I/O failure while loading or storing.
    #[error("{op}: i/o error on {path}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for STAR table operations.
pub type Result<T> = std::result::Result<T, StarError>;

impl StarError {
    /// Create a Schema error.
    pub fn schema(op: &'static str, name: impl Into<String>) -> Self {
        Self::Schema {
            op,
            name: name.into(),
        }
    }

    /// Create a LengthMismatch error.
    pub fn length_mismatch(
        op: &'static str,
        name: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::LengthMismatch {
            op,
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create a ColumnCount error.
    pub fn column_count(op: &'static str, expected: usize, actual: usize) -> Self {
        Self::ColumnCount {
            op,
            expected,
            actual,
        }
    }

    /// Create an UnknownColumn error.
    pub fn unknown_column(op: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownColumn {
            op,
            name: name.into(),
        }
    }

    /// Create a RowOutOfRange error.
    pub fn row_out_of_range(op: &'static str, row: usize, nrows: usize) -> Self {
        Self::RowOutOfRange { op, row, nrows }
    }

    /// Create a Format error.
    pub fn format(op: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            op,
            message: message.into(),
        }
    }

    /// Create a Format error from a failed value cast.
    pub fn cast(op: &'static str, err: &CastError) -> Self {
        Self::Format {
            op,
            message: err.to_string(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(op: &'static str, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a MissingColumn error.
    pub fn missing_column(op: &'static str, name: impl Into<String>) -> Self {
        Self::MissingColumn {
            op,
            name: name.into(),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(op: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op,
            message: message.into(),
        }
    }

    /// Create an Io error.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::value::ColumnType;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = StarError::schema("add_column", "_rlnBogus");
        assert_eq!(
            format!("{err}"),
            "add_column: column name not recognized: _rlnBogus"
        );

        let err = StarError::column_count("add_row", 3, 2);
        assert_eq!(format!("{err}"), "add_row: row has 2 values, table has 3 columns");

        let err = StarError::not_found("find_element", "_rlnImageName", "missing.mrc");
        assert_eq!(
            format!("{err}"),
            "find_element: no row where column '_rlnImageName' equals 'missing.mrc'"
        );
    }

    #[test]
    fn test_cast_error_carries_operation() {
        let cast = CastError::new("abc", ColumnType::Integer);
        let err = StarError::cast("load", &cast);
        assert_eq!(format!("{err}"), "load: cannot cast 'abc' to integer");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StarError::io("load", "/tmp/particles.star", io_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
