use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, instrument};

use frontend::{FrontEnd, GoliteFrontEnd};
use tools::errors::{ErrorEntry, ErrorKind, Position};

use crate::symbols::Symbol;
use crate::{EvalConfig, Interpreter};

/// Everything a caller gets back from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    // True when no error of any kind was collected
    pub success: bool,
    pub output: Vec<String>,
    pub errors: Vec<ErrorEntry>,
    #[serde(rename = "symbolTable")]
    pub symbols: Vec<Symbol>,
    pub elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorsView<'a> {
    pub success: bool,
    pub errors: &'a [ErrorEntry],
}

#[derive(Debug, Serialize)]
pub struct SymbolsView<'a> {
    #[serde(rename = "symbolTable")]
    pub symbols: &'a [Symbol],
}

impl RunReport {
    pub fn errors_only(&self) -> ErrorsView<'_> {
        ErrorsView {
            success: self.success,
            errors: &self.errors,
        }
    }

    pub fn symbols_only(&self) -> SymbolsView<'_> {
        SymbolsView {
            symbols: &self.symbols,
        }
    }
}

/// Parses and evaluates `source` with the built-in front end.
pub fn run(source: &str, config: &EvalConfig) -> RunReport {
    run_with(&GoliteFrontEnd, source, config)
}

/// Front end errors come first. The recovered program is evaluated anyway,
/// its errors follow.
#[instrument(skip_all, fields(source_len = source.len()))]
pub fn run_with<F: FrontEnd + ?Sized>(
    front_end: &F,
    source: &str,
    config: &EvalConfig,
) -> RunReport {
    let start = Instant::now();

    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        let parsed = front_end.parse(source);
        debug!(
            declarations = parsed.program.declarations.len(),
            errors = parsed.errors.len(),
            "parsed"
        );

        let mut interpreter = Interpreter::new(config.clone());
        interpreter.diagnostics_mut().extend(parsed.errors);
        interpreter.execute_program(&parsed.program);

        interpreter.into_parts()
    }));

    let (output, errors, symbols) = match res {
        Ok((output, diagnostics, symbols)) => {
            (output, diagnostics.into_entries(), symbols.into_symbols())
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            debug!(%reason, "evaluation panicked");

            let entry = ErrorEntry::new(
                ErrorKind::Fatal,
                format!("internal fault: {reason}"),
                Position::default(),
            );
            (vec![], vec![entry], vec![])
        }
    };

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(errors = errors.len(), elapsed_ms, "run finished");

    RunReport {
        success: errors.is_empty(),
        output,
        errors,
        symbols,
        elapsed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontend::ast::Program;
    use frontend::ParseOutput;
    use pretty_assertions::assert_eq;

    struct Panicking;

    impl FrontEnd for Panicking {
        fn parse(&self, _source: &str) -> ParseOutput {
            panic!("front end exploded")
        }
    }

    struct Canned(Vec<ErrorEntry>);

    impl FrontEnd for Canned {
        fn parse(&self, _source: &str) -> ParseOutput {
            ParseOutput {
                program: Program {
                    declarations: vec![],
                },
                errors: self.0.clone(),
            }
        }
    }

    #[test]
    fn successful_run() {
        let report = run(
            "func main() {\n x := 2\n println(x * 21)\n}",
            &EvalConfig::default(),
        );

        assert!(report.success);
        assert_eq!(report.output, vec!["42".to_string()]);
        assert!(report.errors.is_empty());
        assert_eq!(report.symbols.len(), 2);
        assert!(report.elapsed_ms >= 0.0);
    }

    #[test]
    fn syntax_errors_come_before_semantic_ones() {
        let report = run(
            "func main() {\n x := )\n println(y)\n}",
            &EvalConfig::default(),
        );

        assert!(!report.success);
        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Syntactic, ErrorKind::Semantic]);
        assert_eq!(report.errors[1].description, "undeclared variable: 'y'");
        assert_eq!(report.output, vec!["nil".to_string()]);
    }

    #[test]
    fn front_end_errors_alone_fail_the_run() {
        let entry = ErrorEntry::new(ErrorKind::Lexical, "bad", Position::new(1, 1));
        let report = run_with(&Canned(vec![entry.clone()]), "", &EvalConfig::default());

        assert!(!report.success);
        assert_eq!(report.errors, vec![entry]);
    }

    #[test]
    fn panic_becomes_one_fatal_entry() {
        let report = run_with(&Panicking, "", &EvalConfig::default());

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Fatal);
        assert_eq!(
            report.errors[0].description,
            "internal fault: front end exploded"
        );
    }

    #[test]
    fn views_serialize() {
        let report = run("var g int32 = 1", &EvalConfig::default());

        let errors = serde_json::to_value(report.errors_only()).unwrap();
        assert_eq!(errors, serde_json::json!({ "success": true, "errors": [] }));

        let symbols = serde_json::to_value(report.symbols_only()).unwrap();
        assert_eq!(symbols["symbolTable"][0]["identifier"], "g");
        assert_eq!(symbols["symbolTable"][0]["type"], "int32");
    }
}
