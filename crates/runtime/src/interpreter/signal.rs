use tools::errors::Position;

use super::interp_errors::{RuntimeError, SemanticError};
use crate::values::RuntimeVal;

/// Everything that leaves a construct early. Loops, switches and calls
/// catch the kinds they handle and let the others go up. Semantic errors
/// are caught by the closest statement or expression, which records them.
#[derive(Debug)]
pub(crate) enum Unwind {
    Break,
    Continue,
    Return(RuntimeVal),
    Semantic(SemanticError, Position),
    Fatal(RuntimeError, Position),
}

pub(crate) type Exec<T> = Result<T, Unwind>;

/// Attaches a position to an error, turning it into a semantic unwind.
pub(crate) trait At<T> {
    fn at(self, pos: Position) -> Exec<T>;
}

impl<T, E: Into<SemanticError>> At<T> for Result<T, E> {
    fn at(self, pos: Position) -> Exec<T> {
        self.map_err(|e| Unwind::Semantic(e.into(), pos))
    }
}

pub(crate) fn semantic<T>(err: SemanticError, pos: Position) -> Exec<T> {
    Err(Unwind::Semantic(err, pos))
}
