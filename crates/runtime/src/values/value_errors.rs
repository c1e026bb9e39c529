use thiserror::Error;

use super::ValueKind;

#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    // Operations
    #[error("invalid operation: cannot apply '{op}' to '{lhs}' and '{rhs}'")]
    InvalidOperation {
        op: &'static str,
        lhs: ValueKind,
        rhs: ValueKind,
    },

    #[error("string repeat count must not be negative, found: {0}")]
    NegativeRepeat(i32),

    // Arrays
    #[error("index out of range: index {0} with length {1}")]
    ArrayOverIndexing(i64, usize),

    #[error("array index must be of type int32 or rune, found '{0}'")]
    NonIntegerIndex(ValueKind),

    #[error("array size must be of type int32, found '{0}'")]
    NonIntegerArraySize(ValueKind),

    #[error("array size must not be negative, found: {0}")]
    NegativeArraySize(i32),

    #[error("too many elements in array literal: expected at most {0}, found {1}")]
    TooManyElements(usize, usize),

    #[error("cannot index a value of type '{0}'")]
    NonArrayIndexing(ValueKind),
}
