mod arrays;
mod expr;
mod functions;
mod interp_errors;
mod places;
mod signal;
mod stmt;

use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

use frontend::ast::{FnDeclaration, Program, StatementKind};
use tools::errors::{Diagnostics, Position};

pub use interp_errors::{RuntimeError, SemanticError};
use signal::{Exec, Unwind};

use crate::environment::{Env, EnvRef};
use crate::symbols::SymbolTable;
use crate::EvalConfig;

/// One evaluation session. It owns every piece of state of a run, so two
/// interpreters never share anything.
pub struct Interpreter {
    global: EnvRef,
    functions: HashMap<String, Rc<FnDeclaration>>,
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    output: Vec<String>,
    config: EvalConfig,
    call_depth: usize,
    steps: u64,
}

impl Interpreter {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            global: Env::global(),
            functions: HashMap::new(),
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::new(),
            output: vec![],
            config,
            call_depth: 0,
            steps: 0,
        }
    }

    /// Runs the three passes over the top level: hoisting of the functions,
    /// global declarations in source order, then `main`. A fatal fault
    /// stops the run and is recorded as the last error.
    pub fn execute_program(&mut self, program: &Program) {
        if let Err(Unwind::Fatal(err, pos)) = self.run_program(program) {
            debug!(%err, "evaluation aborted");
            self.diagnostics.report(&err, pos);
        }
    }

    fn run_program(&mut self, program: &Program) -> Exec<()> {
        debug!("hoisting functions");
        let mut main = None;

        for decl in &program.declarations {
            let StatementKind::FnDeclaration(func) = &decl.kind else {
                continue;
            };

            match func.name.as_str() {
                "main" if main.is_some() => self.report(
                    SemanticError::FunctionRedeclared(func.name.clone()),
                    decl.pos,
                ),
                "main" => main = Some((func, decl.pos)),
                _ => self.hoist(func, decl.pos),
            }
        }

        debug!("evaluating global declarations");
        let global = self.global.clone();
        for decl in &program.declarations {
            if !matches!(decl.kind, StatementKind::FnDeclaration(_)) {
                self.resolve(decl, &global)?;
            }
        }

        if let Some((main, pos)) = main {
            debug!("running main");
            self.run_main(main, pos)?;
        }

        Ok(())
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_parts(self) -> (Vec<String>, Diagnostics, SymbolTable) {
        (self.output, self.diagnostics, self.symbols)
    }

    fn report(&mut self, err: SemanticError, pos: Position) {
        trace!(%err, %pos, "semantic error");
        self.diagnostics.report(&err, pos);
    }

    // Each executed statement costs one step of the optional budget
    fn tick(&mut self, pos: Position) -> Exec<()> {
        self.steps += 1;

        match self.config.max_steps {
            Some(max) if self.steps > max => {
                Err(Unwind::Fatal(RuntimeError::StepBudgetExceeded(max), pos))
            }
            _ => Ok(()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use frontend::{FrontEnd, GoliteFrontEnd};
    use tools::errors::ErrorEntry;

    pub(crate) fn interpret_with(code: &str, config: EvalConfig) -> Interpreter {
        let parsed = GoliteFrontEnd.parse(code);
        assert!(parsed.errors.is_empty(), "syntax errors: {:?}", parsed.errors);

        let mut interpreter = Interpreter::new(config);
        interpreter.execute_program(&parsed.program);
        interpreter
    }

    pub(crate) fn interpret(code: &str) -> Interpreter {
        interpret_with(code, EvalConfig::default())
    }

    // Output lines of a program expected to run without any error
    pub(crate) fn output_of(code: &str) -> Vec<String> {
        let interpreter = interpret(code);
        assert!(
            interpreter.diagnostics().is_empty(),
            "unexpected errors: {:?}",
            interpreter.diagnostics().entries()
        );

        interpreter.output().to_vec()
    }

    pub(crate) fn errors_of(code: &str) -> Vec<ErrorEntry> {
        interpret(code).diagnostics().entries().to_vec()
    }
}
