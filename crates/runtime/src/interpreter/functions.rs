use std::rc::Rc;
use tracing::trace;

use frontend::ast::{Expr, FnDeclaration};
use tools::errors::Position;

use super::signal::{semantic, At, Exec, Unwind};
use super::{Interpreter, RuntimeError, SemanticError};
use crate::environment::{Env, EnvRef};
use crate::native_functions;
use crate::symbols::ScopeKind;
use crate::values::RuntimeVal;

/// Grows the native stack when needed before running `f`.
#[inline]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 100 * 1024;
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

impl Interpreter {
    // Registers a function before any code runs, so calls may come before
    // the declaration
    pub(super) fn hoist(&mut self, func: &FnDeclaration, pos: Position) {
        if self.functions.contains_key(&func.name) {
            self.report(SemanticError::FunctionRedeclared(func.name.clone()), pos);
            return;
        }

        trace!(function = %func.name, "hoisted");
        self.symbols
            .declare(&func.name, "function".into(), &RuntimeVal::Nil, pos);
        self.functions
            .insert(func.name.clone(), Rc::new(func.clone()));
    }

    pub(super) fn run_main(&mut self, main: &FnDeclaration, pos: Position) -> Exec<()> {
        self.symbols
            .declare(&main.name, "function".into(), &RuntimeVal::Nil, pos);

        self.invoke(main, vec![], pos).map(|_| ())
    }

    /// User functions first, then the built-ins.
    pub(super) fn call(
        &mut self,
        callee: &str,
        args: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<RuntimeVal> {
        if let Some(func) = self.functions.get(callee).cloned() {
            let args = self.evaluate_args(args, env)?;
            return self.invoke(&func, args, pos);
        }

        let Some(native) = native_functions::lookup(callee) else {
            return semantic(SemanticError::UndefinedFunction(callee.to_string()), pos);
        };

        let args = self.evaluate_args(args, env)?;
        trace!(function = callee, "built-in call");
        native(&args, &mut self.output).at(pos)
    }

    // A lone argument returning several values spreads over the parameters
    fn evaluate_args(&mut self, args: &[Expr], env: &EnvRef) -> Exec<Vec<RuntimeVal>> {
        if let [arg] = args {
            return match self.evaluate(arg, env)? {
                RuntimeVal::Multi(values) => Ok(values),
                value => Ok(vec![value]),
            };
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_single(arg, env)?);
        }

        Ok(values)
    }

    /// Runs a function body in a fresh frame whose parent is the global
    /// frame: callers' locals are never visible.
    fn invoke(
        &mut self,
        func: &FnDeclaration,
        args: Vec<RuntimeVal>,
        pos: Position,
    ) -> Exec<RuntimeVal> {
        if args.len() != func.params.len() {
            return semantic(
                SemanticError::WrongArgNumber(func.name.clone(), func.params.len(), args.len()),
                pos,
            );
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(Unwind::Fatal(
                RuntimeError::CallDepthExceeded(self.config.max_call_depth),
                pos,
            ));
        }

        trace!(function = %func.name, depth = self.call_depth, "call");
        let fn_env = Env::child(&self.global);

        self.symbols.push_scope(ScopeKind::Function(func.name.clone()));
        self.call_depth += 1;

        let res = ensure_sufficient_stack(|| self.run_function(func, args, &fn_env));

        self.call_depth -= 1;
        self.symbols.pop_scope();

        match res {
            Ok(()) => Ok(RuntimeVal::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(unwind) => Err(unwind),
        }
    }

    // The function frame is also the frame of the body
    fn run_function(
        &mut self,
        func: &FnDeclaration,
        args: Vec<RuntimeVal>,
        env: &EnvRef,
    ) -> Exec<()> {
        for (param, arg) in func.params.iter().zip(args) {
            let ty = self.eval_type(&param.ty, env)?;

            // Pointers are passed as is, arrays by value get their own copy
            let value = match param.by_pointer() {
                true => arg,
                false => ty.convert(arg.deep_copy()),
            };

            if !ty.accepts(&value) {
                return semantic(
                    SemanticError::TypeMismatch {
                        name: param.name.clone(),
                        expected: ty.to_string(),
                        found: value.type_label(),
                    },
                    param.pos,
                );
            }

            self.bind(env, &param.name, Some(&ty), value, param.pos, false);
        }

        self.exec_statements(&func.body, env)
    }
}
