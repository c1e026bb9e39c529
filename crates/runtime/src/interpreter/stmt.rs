use std::slice;
use tracing::trace;

use frontend::ast::{BinaryOp, Expr, IfBranch, StatementKind, Stmt, SwitchCase, TypeExpr};
use tools::errors::Position;

use super::places::{coerce, slot_label};
use super::signal::{semantic, Exec, Unwind};
use super::{Interpreter, SemanticError};
use crate::environment::{Env, EnvError, EnvRef};
use crate::symbols::ScopeKind;
use crate::values::{RuntimeVal, ValueKind, VarType};

// init; condition; post
type ForClauses<'a> = (Option<&'a Stmt>, Option<&'a Expr>, Option<&'a Stmt>);

impl Interpreter {
    /// Executes one statement. A semantic error abandons the statement and
    /// is recorded, the other unwinds go up to their handler.
    pub(super) fn resolve(&mut self, stmt: &Stmt, env: &EnvRef) -> Exec<()> {
        self.tick(stmt.pos)?;

        match self.resolve_kind(stmt, env) {
            Err(Unwind::Semantic(err, pos)) => {
                self.report(err, pos);
                Ok(())
            }
            res => res,
        }
    }

    fn resolve_kind(&mut self, stmt: &Stmt, env: &EnvRef) -> Exec<()> {
        match &stmt.kind {
            StatementKind::VarDeclaration {
                names,
                var_type,
                values,
            } => self.declare_vars(names, var_type.as_ref(), values, env, stmt.pos),
            StatementKind::ConstDeclaration {
                name,
                var_type,
                value,
            } => self.declare_const(name, var_type.as_ref(), value, env, stmt.pos),
            StatementKind::ShortVarDeclaration { names, values } => {
                self.short_declaration(names, values, env, stmt.pos)
            }
            StatementKind::Assignment { target, op, value } => {
                self.assign(target, *op, value, env, stmt.pos)
            }
            StatementKind::IncDec { target, op } => self.inc_dec(target, *op, env, stmt.pos),
            StatementKind::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(())
            }
            StatementKind::Block(body) => self.exec_block(body, env, Some(ScopeKind::Block)),
            StatementKind::If {
                branches,
                else_block,
            } => self.exec_if(branches, else_block.as_deref(), env),
            StatementKind::For {
                init,
                condition,
                post,
                body,
            } => {
                let clauses = (init.as_deref(), condition.as_ref(), post.as_deref());
                self.exec_for(clauses, body, env, stmt.pos)
            }
            StatementKind::Switch {
                subject,
                cases,
                default,
            } => self.exec_switch(subject, cases, default.as_deref(), env),
            StatementKind::Break => match self.symbols.can_break() {
                true => Err(Unwind::Break),
                false => semantic(SemanticError::MisplacedBreak, stmt.pos),
            },
            StatementKind::Continue => match self.symbols.can_continue() {
                true => Err(Unwind::Continue),
                false => semantic(SemanticError::MisplacedContinue, stmt.pos),
            },
            StatementKind::Return(values) => {
                if !self.symbols.can_return() {
                    return semantic(SemanticError::MisplacedReturn, stmt.pos);
                }

                let value = match values.len() {
                    0 => RuntimeVal::Nil,
                    1 => self.evaluate_single(&values[0], env)?,
                    _ => {
                        let mut results = vec![];
                        for value in values {
                            results.push(self.evaluate_single(value, env)?);
                        }
                        RuntimeVal::Multi(results)
                    }
                };

                Err(Unwind::Return(value))
            }
            // Functions are hoisted from the top level, the parser refuses
            // them anywhere else
            StatementKind::FnDeclaration(_) => Ok(()),
        }
    }

    // ------------
    // Declarations
    // ------------
    fn declare_vars(
        &mut self,
        names: &[(String, Position)],
        var_type: Option<&TypeExpr>,
        values: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        let var_type = match var_type {
            Some(ty) => Some(self.eval_type(ty, env)?),
            None => None,
        };

        let values = match values.is_empty() {
            true => vec![],
            false => self.evaluate_values(values, names.len(), env, pos)?,
        };

        for (i, (name, name_pos)) in names.iter().enumerate() {
            if env.borrow().has_local(name) {
                self.report(SemanticError::Redeclared(name.clone()), *name_pos);
                continue;
            }

            let value = match (&var_type, values.get(i)) {
                (Some(ty), Some(val)) => self.typed_value(name, ty, val.clone(), *name_pos),
                (Some(ty), None) => ty.default_value(),
                (None, Some(val)) => val.clone(),
                (None, None) => RuntimeVal::Nil,
            };

            self.bind(env, name, var_type.as_ref(), value, *name_pos, false);
        }

        Ok(())
    }

    fn declare_const(
        &mut self,
        name: &str,
        var_type: Option<&TypeExpr>,
        value: &Expr,
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        if env.borrow().has_local(name) {
            return semantic(SemanticError::Redeclared(name.to_string()), pos);
        }

        let var_type = match var_type {
            Some(ty) => Some(self.eval_type(ty, env)?),
            None => None,
        };

        let mut values = self.evaluate_values(slice::from_ref(value), 1, env, pos)?;
        let value = values.pop().unwrap_or(RuntimeVal::Nil);

        let value = match &var_type {
            Some(ty) => self.typed_value(name, ty, value, pos),
            None => value,
        };
        self.bind(env, name, var_type.as_ref(), value, pos, true);

        Ok(())
    }

    fn short_declaration(
        &mut self,
        names: &[(String, Position)],
        values: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        if self.symbols.at_global_scope() {
            return semantic(SemanticError::ShortDeclarationAtGlobal, pos);
        }

        if names.iter().all(|(name, _)| env.borrow().has_local(name)) {
            return semantic(SemanticError::NothingNewToDeclare, pos);
        }

        let values = self.evaluate_values(values, names.len(), env, pos)?;

        for ((name, name_pos), value) in names.iter().zip(values) {
            if !env.borrow().has_local(name) {
                self.bind(env, name, None, value, *name_pos, false);
                continue;
            }

            // Names already declared in this scope are assigned
            if env.borrow().is_const(name) {
                self.report(EnvError::AssignToConst(name.clone()).into(), *name_pos);
                continue;
            }

            let current = env.borrow().get(name).unwrap_or(RuntimeVal::Nil);
            let slot = env.borrow().kind_of(name).unwrap_or(current.kind());
            match coerce(slot, value.clone()) {
                Some(value) => self.store_var(env, name, value, *name_pos)?,
                None => self.report(
                    SemanticError::TypeMismatch {
                        name: name.clone(),
                        expected: slot_label(slot, &current),
                        found: value.type_label(),
                    },
                    *name_pos,
                ),
            }
        }

        Ok(())
    }

    // The declared type converts an int32 first, nil fits any type. A value
    // of another type is reported and the variable gets the zero value.
    fn typed_value(
        &mut self,
        name: &str,
        ty: &VarType,
        value: RuntimeVal,
        pos: Position,
    ) -> RuntimeVal {
        let value = ty.convert(value);
        if value.is_nil() || ty.accepts(&value) {
            return value;
        }

        self.report(
            SemanticError::TypeMismatch {
                name: name.to_string(),
                expected: ty.to_string(),
                found: value.type_label(),
            },
            pos,
        );

        ty.default_value()
    }

    // Defines the name in the given frame and records the declaration
    // Without a declared type, the kind and label come from the value
    pub(super) fn bind(
        &mut self,
        env: &EnvRef,
        name: &str,
        declared: Option<&VarType>,
        value: RuntimeVal,
        pos: Position,
        constant: bool,
    ) {
        let label = match declared {
            Some(ty) => ty.to_string(),
            None => value.type_label(),
        };
        let id = self.symbols.declare(name, label, &value, pos);

        let mut env = env.borrow_mut();
        match constant {
            true => env.define_const(name, value),
            false => env.define(name, value),
        }
        if let Some(ty) = declared {
            env.set_kind(name, ty.kind());
        }
        env.bind_symbol(name, id);
    }

    /// Values for `count` targets. A single call returning several values
    /// is unpacked.
    fn evaluate_values(
        &mut self,
        values: &[Expr],
        count: usize,
        env: &EnvRef,
        pos: Position,
    ) -> Exec<Vec<RuntimeVal>> {
        if values.len() == 1 {
            return match self.evaluate(&values[0], env)? {
                RuntimeVal::Multi(results) if results.len() == count => Ok(results),
                RuntimeVal::Multi(results) => {
                    semantic(SemanticError::AssignmentMismatch(count, results.len()), pos)
                }
                _ if count != 1 => semantic(SemanticError::AssignmentMismatch(count, 1), pos),
                value => Ok(vec![value]),
            };
        }

        if values.len() != count {
            return semantic(SemanticError::AssignmentMismatch(count, values.len()), pos);
        }

        let mut results = vec![];
        for value in values {
            results.push(self.evaluate_single(value, env)?);
        }

        Ok(results)
    }

    // ------------
    // Control flow
    // ------------

    /// Runs statements in a new frame. The symbol scope is only pushed when
    /// the caller does not already manage one.
    pub(super) fn exec_block(
        &mut self,
        body: &[Stmt],
        env: &EnvRef,
        scope: Option<ScopeKind>,
    ) -> Exec<()> {
        let block_env = Env::child(env);

        let framed = scope.is_some();
        if let Some(kind) = scope {
            trace!(scope = %kind, "enter scope");
            self.symbols.push_scope(kind);
        }

        let res = self.exec_statements(body, &block_env);

        if framed {
            trace!(scope = %self.symbols.current_scope(), "exit scope");
            self.symbols.pop_scope();
        }

        res
    }

    pub(super) fn exec_statements(&mut self, body: &[Stmt], env: &EnvRef) -> Exec<()> {
        for stmt in body {
            self.resolve(stmt, env)?;
        }

        Ok(())
    }

    // The first truthy branch runs, or else the else block
    fn exec_if(
        &mut self,
        branches: &[IfBranch],
        else_block: Option<&[Stmt]>,
        env: &EnvRef,
    ) -> Exec<()> {
        for branch in branches {
            if self.condition(&branch.condition, env)? {
                return self.exec_block(&branch.body, env, Some(ScopeKind::IfBlock));
            }
        }

        match else_block {
            Some(body) => self.exec_block(body, env, Some(ScopeKind::ElseBlock)),
            None => Ok(()),
        }
    }

    // A condition producing several values aborts the statement
    fn condition(&mut self, expr: &Expr, env: &EnvRef) -> Exec<bool> {
        match self.evaluate(expr, env)? {
            RuntimeVal::Multi(_) => {
                semantic(SemanticError::InvalidCondition(ValueKind::Multi), expr.pos)
            }
            value => Ok(value.is_truthy()),
        }
    }

    // One frame for the whole loop, the loop variable keeps its value
    // between iterations. The body gets a new frame each time.
    fn exec_for(
        &mut self,
        clauses: ForClauses,
        body: &[Stmt],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        let for_env = Env::child(env);
        self.symbols.push_scope(ScopeKind::For);

        let res = self.run_loop(clauses, body, &for_env, pos);

        self.symbols.pop_scope();
        res
    }

    fn run_loop(
        &mut self,
        (init, condition, post): ForClauses,
        body: &[Stmt],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        if let Some(init) = init {
            self.resolve(init, env)?;
        }

        loop {
            // An empty body still costs a step per iteration
            self.tick(pos)?;

            if let Some(condition) = condition {
                if !self.condition(condition, env)? {
                    break;
                }
            }

            match self.exec_block(body, env, None) {
                Ok(()) | Err(Unwind::Continue) => {}
                Err(Unwind::Break) => break,
                Err(unwind) => return Err(unwind),
            }

            if let Some(post) = post {
                self.resolve(post, env)?;
            }
        }

        Ok(())
    }

    // Once a case matched, every following case runs too. `default` only
    // runs when nothing matched.
    fn exec_switch(
        &mut self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: Option<&[Stmt]>,
        env: &EnvRef,
    ) -> Exec<()> {
        let switch_env = Env::child(env);
        self.symbols.push_scope(ScopeKind::Switch);

        let res = match self.run_switch(subject, cases, default, &switch_env) {
            Err(Unwind::Break) => Ok(()),
            res => res,
        };

        self.symbols.pop_scope();
        res
    }

    fn run_switch(
        &mut self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: Option<&[Stmt]>,
        env: &EnvRef,
    ) -> Exec<()> {
        let subject = self.evaluate_single(subject, env)?;
        let mut matched = false;

        for case in cases {
            if !matched {
                matched = self.case_matches(&subject, &case.values, env)?;
            }

            if matched {
                trace!(line = case.pos.line, "switch case");
                self.exec_block(&case.body, env, None)?;
            }
        }

        if let (false, Some(body)) = (matched, default) {
            self.exec_block(body, env, None)?;
        }

        Ok(())
    }

    fn case_matches(
        &mut self,
        subject: &RuntimeVal,
        values: &[Expr],
        env: &EnvRef,
    ) -> Exec<bool> {
        for value in values {
            let value = self.evaluate_single(value, env)?;

            if subject
                .calculate(&value, BinaryOp::Eq)
                .is_ok_and(|eq| eq.is_truthy())
            {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{errors_of, interpret, output_of};
    use pretty_assertions::assert_eq;
    use tools::errors::ErrorKind;

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn global_declarations_then_main() {
        let output = output_of(
            "var x int32 = 10
            var y int32 = 20
            func main() {
                println(x + y)
            }",
        );

        assert_eq!(output, lines(&["30"]));
    }

    #[test]
    fn declarations_default_and_convert() {
        let output = output_of(
            "func main() {
                var a, b int32
                var f float32 = 1
                var r rune = 65
                var s string
                var flag bool
                var m [2][2]int32
                println(a, b, f, r, s == \"\", flag, m)
            }",
        );

        assert_eq!(output, lines(&["0 0 1 A true false [[0 0] [0 0]]"]));
    }

    #[test]
    fn redeclaration_in_same_block() {
        let interpreter = interpret(
            "func main() {
                var x int32
                var x int32
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "'x' redeclared in this block");

        let xs: Vec<_> = interpreter
            .symbols()
            .symbols()
            .iter()
            .filter(|s| s.identifier == "x")
            .collect();
        assert_eq!(xs.len(), 1);
        assert_eq!((xs[0].line, xs[0].column), (2, 21));
    }

    #[test]
    fn shadowing_in_nested_block() {
        let output = output_of(
            "func main() {
                x := 1
                {
                    x := \"inner\"
                    println(x)
                }
                println(x)
            }",
        );

        assert_eq!(output, lines(&["inner", "1"]));
    }

    #[test]
    fn nothing_new_to_declare() {
        let errors = errors_of(
            "func main() {
                x := 1
                x := 2
            }",
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Semantic);
        assert_eq!(errors[0].description, "no new variables on left side of :=");
    }

    #[test]
    fn short_declaration_reuses_old_names() {
        let output = output_of(
            "func main() {
                x := 1
                x, y := 5, \"y\"
                println(x, y)
            }",
        );
        assert_eq!(output, lines(&["5 y"]));

        let errors = errors_of(
            "func main() {
                x := 1
                x, y := \"no\", 2
            }",
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].description,
            "cannot use value of type 'string' as 'int32' for 'x'"
        );
    }

    #[test]
    fn short_declaration_at_global_scope() {
        let errors = errors_of("x := 1\nfunc main() {}");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].description,
            "short variable declaration is not allowed at global scope"
        );
    }

    #[test]
    fn const_cannot_be_assigned() {
        let errors = errors_of(
            "const limit int32 = 3
            func main() {
                limit = 4
                limit++
            }",
        );

        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.description == "cannot assign to constant 'limit'"));
    }

    #[test]
    fn assignment_checks_kinds() {
        let interpreter = interpret(
            "func main() {
                var x int32 = 1
                var f float32
                x = \"text\"
                f = 2
                x += 4
                println(x, f)
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 4);
        assert_eq!(interpreter.output(), &lines(&["5 2"]));
    }

    #[test]
    fn count_mismatch_aborts_the_declaration() {
        let interpreter = interpret(
            "func main() {
                var a, b int32 = 1
                println(a)
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].description, "assignment mismatch: 2 variables but 1 values");
        assert_eq!(errors[1].description, "undeclared variable: 'a'");
        assert_eq!(interpreter.output(), &lines(&["nil"]));
    }

    #[test]
    fn typed_declaration_accepts_nil() {
        let interpreter = interpret(
            "func main() {
                var q int32 = 10 / 0
                const c float32 = 1 % 0
                println(q, c)
                q = 4
                q = \"four\"
                println(q)
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].description,
            "cannot use value of type 'string' as 'int32' for 'q'"
        );
        assert_eq!(interpreter.output(), &lines(&["nil nil", "4"]));
    }

    #[test]
    fn multi_value_condition_skips_the_statement() {
        let interpreter = interpret(
            "func pair() (int32, int32) {
                return 1, 2
            }
            func main() {
                if pair() {
                    println(\"then\")
                } else {
                    println(\"else\")
                }
                for pair() {
                    println(\"loop\")
                }
                println(\"after\")
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Semantic
            && e.description == "condition must be a single value, found 'multi'"));
        assert_eq!((errors[0].line, errors[1].line), (5, 10));
        assert_eq!(interpreter.output(), &lines(&["after"]));
    }

    #[test]
    fn if_else_chain() {
        let output = output_of(
            "func grade(n int32) string {
                if n >= 90 {
                    return \"A\"
                } else if n >= 50 {
                    return \"B\"
                } else {
                    return \"C\"
                }
            }
            func main() {
                println(grade(95), grade(60), grade(10))
            }",
        );

        assert_eq!(output, lines(&["A B C"]));
    }

    #[test]
    fn for_loop_forms() {
        let output = output_of(
            "func main() {
                sum := 0
                for i := 0; i < 5; i++ {
                    if i == 1 {
                        continue
                    }
                    sum += i
                }

                n := 0
                for n < 3 {
                    n++
                }

                k := 0
                for {
                    k++
                    if k == 4 {
                        break
                    }
                }
                println(sum, n, k)
            }",
        );

        assert_eq!(output, lines(&["9 3 4"]));
    }

    #[test]
    fn body_declarations_are_fresh_each_iteration() {
        let output = output_of(
            "func main() {
                for i := 0; i < 2; i++ {
                    var local int32 = i * 10
                    println(local)
                }
            }",
        );

        assert_eq!(output, lines(&["0", "10"]));
    }

    #[test]
    fn switch_falls_through() {
        let output = output_of(
            "func main() {
                switch 1 {
                case 1:
                    println(\"a\")
                case 2:
                    println(\"b\")
                }
            }",
        );

        assert_eq!(output, lines(&["a", "b"]));
    }

    #[test]
    fn switch_break_and_default() {
        let output = output_of(
            "func main() {
                switch 2 {
                case 1, 2:
                    println(\"low\")
                    break
                case 3:
                    println(\"high\")
                }
                switch \"x\" {
                case \"y\":
                    println(\"y\")
                default:
                    println(\"default\")
                }
            }",
        );

        assert_eq!(output, lines(&["low", "default"]));
    }

    #[test]
    fn break_in_switch_inside_loop_leaves_the_switch() {
        let output = output_of(
            "func main() {
                for i := 0; i < 3; i++ {
                    switch i {
                    case 1:
                        break
                    }
                    println(i)
                }
            }",
        );

        assert_eq!(output, lines(&["0", "1", "2"]));
    }

    #[test]
    fn misplaced_control_flow() {
        let errors = errors_of(
            "func f() {
                break
            }
            func main() {
                continue
                switch 1 {
                case 1:
                    continue
                }
                f()
            }",
        );

        let descriptions: Vec<_> = errors.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "continue is not in a loop",
                "continue is not in a loop",
                "break is not in a loop or switch",
            ]
        );
    }

    #[test]
    fn symbol_scopes() {
        let interpreter = interpret(
            "var g int32 = 1
            func main() {
                for i := 0; i < 1; i++ {
                    if true {
                        a := 1
                    } else {
                        b := 2
                    }
                }
                switch 1 {
                case 1:
                    c := 3
                }
                {
                    d := 4
                }
            }",
        );

        let scopes: Vec<(String, String)> = interpreter
            .symbols()
            .symbols()
            .iter()
            .map(|s| (s.identifier.clone(), s.scope.clone()))
            .collect();

        assert_eq!(
            scopes,
            vec![
                ("g".to_string(), "global".to_string()),
                ("main".to_string(), "global".to_string()),
                ("i".to_string(), "for".to_string()),
                ("a".to_string(), "if-block".to_string()),
                ("c".to_string(), "switch".to_string()),
                ("d".to_string(), "block".to_string()),
            ]
        );
    }

    #[test]
    fn symbols_follow_assignments() {
        let interpreter = interpret(
            "func main() {
                x := 1
                x = 7
                for i := 0; i < 3; i++ {
                }
            }",
        );

        let symbols = interpreter.symbols().symbols();
        assert_eq!(symbols[1].identifier, "x");
        assert_eq!(symbols[1].value, "7");
        assert_eq!(symbols[2].identifier, "i");
        assert_eq!(symbols[2].value, "3");
    }
}
