use std::rc::Rc;

use frontend::ast::{Expr, ExpressionKind, LogicalOp, UnaryOp};
use tools::errors::Position;

use super::signal::{semantic, At, Exec, Unwind};
use super::{Interpreter, SemanticError};
use crate::environment::{Env, EnvError, EnvRef};
use crate::values::RuntimeVal;

impl Interpreter {
    /// Evaluates an expression. A semantic error is recorded and the
    /// expression yields `nil`, so the enclosing code goes on.
    pub(super) fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> Exec<RuntimeVal> {
        match self.evaluate_kind(expr, env) {
            Err(Unwind::Semantic(err, pos)) => {
                self.report(err, pos);
                Ok(RuntimeVal::Nil)
            }
            res => res,
        }
    }

    // Operands and other places expecting exactly one value
    pub(super) fn evaluate_single(&mut self, expr: &Expr, env: &EnvRef) -> Exec<RuntimeVal> {
        match self.evaluate(expr, env)? {
            RuntimeVal::Multi(_) => semantic(SemanticError::MultiValueInSingleContext, expr.pos),
            value => Ok(value),
        }
    }

    fn evaluate_kind(&mut self, expr: &Expr, env: &EnvRef) -> Exec<RuntimeVal> {
        let pos = expr.pos;

        match &expr.kind {
            ExpressionKind::IntLiteral(text) => text
                .parse::<i32>()
                .map(RuntimeVal::Int32)
                .map_err(|_| SemanticError::IntLiteralOutOfRange(text.clone()))
                .at(pos),
            ExpressionKind::FloatLiteral(text) => text
                .parse::<f32>()
                .map(RuntimeVal::Float32)
                .map_err(|_| SemanticError::InvalidFloatLiteral(text.clone()))
                .at(pos),
            ExpressionKind::StringLiteral(raw) => Ok(RuntimeVal::Str(decode_escapes(raw))),
            ExpressionKind::RuneLiteral(raw) => Ok(RuntimeVal::Rune(decode_rune(raw))),
            ExpressionKind::BoolLiteral(b) => Ok(RuntimeVal::Bool(*b)),
            ExpressionKind::NilLiteral => Ok(RuntimeVal::Nil),
            ExpressionKind::Identifier(name) => self.lookup(name, env, pos),
            ExpressionKind::Binary { lhs, op, rhs } => {
                let lhs = self.evaluate_single(lhs, env)?;
                let rhs = self.evaluate_single(rhs, env)?;

                lhs.calculate(&rhs, *op).at(pos)
            }
            // Short-circuits, the result is always a bool
            ExpressionKind::Logical { lhs, op, rhs } => {
                let lhs = self.evaluate_single(lhs, env)?.is_truthy();

                match (op, lhs) {
                    (LogicalOp::And, false) => Ok(RuntimeVal::Bool(false)),
                    (LogicalOp::Or, true) => Ok(RuntimeVal::Bool(true)),
                    _ => Ok(RuntimeVal::Bool(self.evaluate_single(rhs, env)?.is_truthy())),
                }
            }
            ExpressionKind::Unary { op, operand } => {
                let operand = self.evaluate_single(operand, env)?;

                Ok(match (op, operand) {
                    (UnaryOp::Neg, RuntimeVal::Int32(nb)) => RuntimeVal::Int32(nb.wrapping_neg()),
                    (UnaryOp::Neg, RuntimeVal::Float32(nb)) => RuntimeVal::Float32(-nb),
                    (UnaryOp::Neg, _) => RuntimeVal::Nil,
                    (UnaryOp::Not, operand) => RuntimeVal::Bool(!operand.is_truthy()),
                })
            }
            ExpressionKind::AddressOf(name) => self.address_of(name, env, pos),
            // Reads the slot as it is now
            ExpressionKind::Deref(inner) => {
                let pointer = self.evaluate_single(inner, env)?;
                let label = match &inner.kind {
                    ExpressionKind::Identifier(name) => name.as_str(),
                    _ => "expression",
                };

                let (owner, name) = self.follow_pointer(label, &pointer, pos)?;
                let value = owner.borrow().get(&name);

                value.ok_or(EnvError::UndeclaredVar(name)).at(pos)
            }
            ExpressionKind::Call { callee, args } => self.call(callee, args, env, pos),
            ExpressionKind::Index { name, indices } => self.index(name, indices, env, pos),
            ExpressionKind::ArrayLiteral { ty, elements } => {
                self.array_literal(ty, elements, env, pos)
            }
            ExpressionKind::CompositeList(_) => {
                semantic(SemanticError::UnexpectedElementList, pos)
            }
        }
    }

    pub(super) fn lookup(&self, name: &str, env: &EnvRef, pos: Position) -> Exec<RuntimeVal> {
        env.borrow()
            .get(name)
            .ok_or_else(|| EnvError::UndeclaredVar(name.to_string()))
            .at(pos)
    }

    // The pointer designates the frame defining the name
    fn address_of(&self, name: &str, env: &EnvRef, pos: Position) -> Exec<RuntimeVal> {
        let owner = Env::resolve(env, name)
            .ok_or_else(|| EnvError::UndeclaredVar(name.to_string()))
            .at(pos)?;

        if owner.borrow().is_const(name) {
            return semantic(SemanticError::AddressOfConst(name.to_string()), pos);
        }

        Ok(RuntimeVal::Pointer {
            name: name.to_string(),
            env: Rc::downgrade(&owner),
        })
    }
}

/// Decodes `\n \t \r \\ \" \'`. Other escapes were reported by the lexer
/// and are kept as written.
pub(super) fn decode_escapes(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some(esc @ ('\\' | '"' | '\'')) => decoded.push(esc),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }

    decoded
}

// Code point of the single character, or of its escape sequence
fn decode_rune(raw: &str) -> i32 {
    decode_escapes(raw)
        .chars()
        .next()
        .map_or(0, |c| u32::from(c) as i32)
}
