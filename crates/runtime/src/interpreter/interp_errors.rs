use thiserror::Error;

use crate::environment::EnvError;
use crate::native_functions::NativeFnError;
use crate::values::{ValueError, ValueKind};
use tools::errors::{ErrorKind, ReportCodeErr};

#[derive(Error, Debug, PartialEq)]
pub enum SemanticError {
    #[error("{0}")]
    Value(#[from] ValueError),

    #[error("{0}")]
    Env(#[from] EnvError),

    #[error("{0}")]
    NativeFn(#[from] NativeFnError),

    // Declarations
    #[error("'{0}' redeclared in this block")]
    Redeclared(String),

    #[error("no new variables on left side of :=")]
    NothingNewToDeclare,

    #[error("short variable declaration is not allowed at global scope")]
    ShortDeclarationAtGlobal,

    #[error("assignment mismatch: {0} variables but {1} values")]
    AssignmentMismatch(usize, usize),

    #[error("cannot use value of type '{found}' as '{expected}' for '{name}'")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("multiple-value call used in single-value context")]
    MultiValueInSingleContext,

    // Literals
    #[error("integer literal out of int32 range: {0}")]
    IntLiteralOutOfRange(String),

    #[error("invalid float literal: {0}")]
    InvalidFloatLiteral(String),

    #[error("element of type '{found}' in array literal of '{expected}'")]
    ArrayElemWrongType { expected: String, found: String },

    #[error("unexpected element list, only arrays of arrays take nested '{{...}}'")]
    UnexpectedElementList,

    #[error("cannot store array '{0}' inside itself")]
    ArrayInsideItself(String),

    // Operators
    #[error("invalid operation: {0} requires an int32 or rune variable, found '{1}'")]
    InvalidIncDec(&'static str, ValueKind),

    // Pointers
    #[error("cannot take the address of constant '{0}'")]
    AddressOfConst(String),

    #[error("invalid indirect of '{0}' of type '{1}'")]
    DerefNonPointer(String, ValueKind),

    #[error("cannot dereference a nil pointer")]
    NilDeref,

    // Control flow
    #[error("break is not in a loop or switch")]
    MisplacedBreak,

    #[error("continue is not in a loop")]
    MisplacedContinue,

    #[error("return is not in a function")]
    MisplacedReturn,

    #[error("condition must be a single value, found '{0}'")]
    InvalidCondition(ValueKind),

    // Functions
    #[error("undefined function: '{0}'")]
    UndefinedFunction(String),

    #[error("function '{0}' redeclared")]
    FunctionRedeclared(String),

    #[error("function '{0}': expected {1} arguments but found {2}")]
    WrongArgNumber(String, usize, usize),
}

impl ReportCodeErr for SemanticError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Semantic
    }
}

/// Faults that stop the whole run.
#[derive(Error, Debug, PartialEq)]
pub enum RuntimeError {
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("step budget of {0} exceeded")]
    StepBudgetExceeded(u64),

    #[error("pointer to '{0}' outlived its scope")]
    DanglingPointer(String),
}

impl ReportCodeErr for RuntimeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}
