use thiserror::*;

use tools::errors::{ErrorKind, ReportCodeErr};

#[derive(Error, Debug, PartialEq)]
pub enum ParserError {
    // Token
    #[error("expected {0}, found '{1}'")]
    FoundWrongToken(&'static str, String),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected '{0}' at end of statement")]
    ExpectedStatementEnd(String),

    #[error("expected type, found '{0}'")]
    ExpectedType(String),

    // Declarations
    #[error("non-declaration statement outside function body: '{0}'")]
    NonDeclarationAtTopLevel(String),

    #[error("variable '{0}' needs a type or an initial value")]
    MissingVarTypeOrValue(String),

    #[error("function declarations are only allowed at top level: '{0}'")]
    NestedFunction(String),

    #[error("missing type for parameter '{0}'")]
    MissingParamType(String),

    // Expressions and statements
    #[error("expression is evaluated but not used")]
    UnusedExpression,

    #[error("cannot assign to this expression, expected a variable, '*pointer' or an array element")]
    InvalidAssignTarget,

    #[error("'&' can only be applied to a variable name")]
    AddressOfNonIdentifier,

    #[error("qualified name '{0}' can only be used as a function call")]
    QualifiedNameNotCalled(String),

    #[error("only one 'default' clause is allowed in a switch")]
    DuplicateDefault,
}

impl ReportCodeErr for ParserError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Syntactic
    }
}
