//! Typed, growable per-particle columns.

use std::fmt;

use crate::error::ColumnError;

/// Element type of a [`Column`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit floating point.
    Float,
    /// 64-bit signed integer.
    Int,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
        }
    }
}

/// A single per-particle value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// Floating-point value.
    Float(f64),
    /// Integer value.
    Int(i64),
}

impl Value {
    /// The element type of this value.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Float(_) => ColumnType::Float,
            Self::Int(_) => ColumnType::Int,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// A growable array of one variable's values, one entry per particle.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Floating-point column.
    Float(Vec<f64>),
    /// Integer column.
    Int(Vec<i64>),
}

impl Column {
    /// An empty column of the given type.
    pub fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Float => Self::Float(Vec::new()),
            ColumnType::Int => Self::Int(Vec::new()),
        }
    }

    /// A column of `len` zeros.
    pub fn zeros(column_type: ColumnType, len: usize) -> Self {
        match column_type {
            ColumnType::Float => Self::Float(vec![0.0; len]),
            ColumnType::Int => Self::Int(vec![0; len]),
        }
    }

    /// Element type.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Float(_) => ColumnType::Float,
            Self::Int(_) => ColumnType::Int,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    /// Returns `true` if the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Self::Float(v) => v.get(index).copied().map(Value::Float),
            Self::Int(v) => v.get(index).copied().map(Value::Int),
        }
    }

    /// Borrow as a float slice.
    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Self::Float(v) => Some(v),
            Self::Int(_) => None,
        }
    }

    /// Borrow as a mutable float slice.
    pub fn as_float_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Self::Float(v) => Some(v),
            Self::Int(_) => None,
        }
    }

    /// Borrow as an integer slice.
    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    /// Borrow as a mutable integer slice.
    pub fn as_int_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    /// Append one value of the column's type.
    pub fn push(&mut self, value: Value) -> Result<(), ColumnError> {
        match (self, value) {
            (Self::Float(v), Value::Float(x)) => v.push(x),
            (Self::Int(v), Value::Int(x)) => v.push(x),
            (col, value) => {
                return Err(ColumnError::TypeMismatch {
                    expected: col.column_type(),
                    found: value.column_type(),
                })
            }
        }
        Ok(())
    }

    /// Append `count` copies of `value`.
    pub fn push_repeated(&mut self, value: Value, count: usize) -> Result<(), ColumnError> {
        match (self, value) {
            (Self::Float(v), Value::Float(x)) => v.resize(v.len() + count, x),
            (Self::Int(v), Value::Int(x)) => v.resize(v.len() + count, x),
            (col, value) => {
                return Err(ColumnError::TypeMismatch {
                    expected: col.column_type(),
                    found: value.column_type(),
                })
            }
        }
        Ok(())
    }

    /// Append every entry of `other`, which must have the same type.
    pub fn extend_from(&mut self, other: &Column) -> Result<(), ColumnError> {
        match (self, other) {
            (Self::Float(v), Self::Float(o)) => v.extend_from_slice(o),
            (Self::Int(v), Self::Int(o)) => v.extend_from_slice(o),
            (col, other) => {
                return Err(ColumnError::TypeMismatch {
                    expected: col.column_type(),
                    found: other.column_type(),
                })
            }
        }
        Ok(())
    }

    /// Append `count` zeros.
    pub fn extend_zeros(&mut self, count: usize) {
        match self {
            Self::Float(v) => v.resize(v.len() + count, 0.0),
            Self::Int(v) => v.resize(v.len() + count, 0),
        }
    }

    /// Keep the entries where `keep` is `true`, preserving their order.
    ///
    /// `keep` must have the same length as the column.
    pub fn retain_mask(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.len(), "mask length mismatch");
        match self {
            Self::Float(v) => retain_by_mask(v, keep),
            Self::Int(v) => retain_by_mask(v, keep),
        }
    }
}

/// Order-preserving in-place filter of `values` by a parallel mask.
pub fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    values.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}
