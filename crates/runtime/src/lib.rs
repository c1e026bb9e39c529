pub mod driver;
pub mod environment;
pub mod interpreter;
pub mod native_functions;
pub mod symbols;
pub mod values;

extern crate frontend;
extern crate tools;

pub use driver::{run, run_with, RunReport};
pub use interpreter::Interpreter;

/// Limits of one evaluation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    // Nested user function calls allowed before the run is aborted
    pub max_call_depth: usize,
    // Executed statements allowed, unlimited when None
    pub max_steps: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_steps: None,
        }
    }
}
