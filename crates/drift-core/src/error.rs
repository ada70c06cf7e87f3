//! Error types for schema construction and column access.

use std::error::Error;
use std::fmt;

use crate::column::ColumnType;

/// Errors detected while building a [`Schema`](crate::Schema).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Two variable definitions share a name.
    DuplicateVariable {
        /// The repeated name.
        name: String,
    },
    /// A variable was declared with an empty name.
    EmptyName,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateVariable { name } => write!(f, "variable '{name}' declared twice"),
            Self::EmptyName => write!(f, "variable name must not be empty"),
        }
    }
}

impl Error for SchemaError {}

/// Errors from typed column operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnError {
    /// A value or column of the wrong element type was supplied.
    TypeMismatch {
        /// The column's element type.
        expected: ColumnType,
        /// The element type that was offered.
        found: ColumnType,
    },
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "column type mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl Error for ColumnError {}
