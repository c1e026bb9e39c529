use std::cell::RefCell;
use std::rc::Rc;

use frontend::ast::{Expr, ExpressionKind, TypeExpr};
use tools::errors::Position;

use super::places::walk_to_last;
use super::signal::{semantic, At, Exec};
use super::{Interpreter, SemanticError};
use crate::environment::{Env, EnvError, EnvRef};
use crate::values::{ArrayType, RuntimeVal, ValueError, VarType};

impl Interpreter {
    /// Turns a written type into a runtime one, evaluating array sizes.
    pub(super) fn eval_type(&mut self, ty: &TypeExpr, env: &EnvRef) -> Exec<VarType> {
        let var_type = match ty {
            TypeExpr::Int32 => VarType::Int32,
            TypeExpr::Float32 => VarType::Float32,
            TypeExpr::Bool => VarType::Bool,
            TypeExpr::String => VarType::String,
            TypeExpr::Rune => VarType::Rune,
            TypeExpr::Array { size, elem } => {
                let size = match self.evaluate_single(size, env)? {
                    RuntimeVal::Int32(nb) => usize::try_from(nb)
                        .map_err(|_| ValueError::NegativeArraySize(nb))
                        .at(size.pos)?,
                    other => {
                        return semantic(
                            ValueError::NonIntegerArraySize(other.kind()).into(),
                            size.pos,
                        )
                    }
                };

                VarType::Array {
                    size,
                    elem: Box::new(self.eval_type(elem, env)?),
                }
            }
            TypeExpr::Pointer(inner) => VarType::Pointer(Box::new(self.eval_type(inner, env)?)),
        };

        Ok(var_type)
    }

    // [N]T{...}
    pub(super) fn array_literal(
        &mut self,
        ty: &TypeExpr,
        elements: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<RuntimeVal> {
        match self.eval_type(ty, env)? {
            VarType::Array { size, elem } => self.build_array(size, *elem, elements, env, pos),
            _ => semantic(SemanticError::UnexpectedElementList, pos),
        }
    }

    /// Elements are evaluated left to right, nested lists build the inner
    /// dimensions. Missing elements get the zero value, extra ones are
    /// reported and dropped.
    fn build_array(
        &mut self,
        size: usize,
        elem: VarType,
        elements: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<RuntimeVal> {
        let mut values = Vec::with_capacity(elements.len());

        for element in elements {
            let value = match (&element.kind, &elem) {
                (
                    ExpressionKind::CompositeList(inner),
                    VarType::Array {
                        size: inner_size,
                        elem: inner_elem,
                    },
                ) => self.build_array(
                    *inner_size,
                    (**inner_elem).clone(),
                    inner,
                    env,
                    element.pos,
                )?,
                (ExpressionKind::CompositeList(_), _) => {
                    self.report(SemanticError::UnexpectedElementList, element.pos);
                    elem.default_value()
                }
                _ => {
                    let value = elem.convert(self.evaluate_single(element, env)?);

                    // Reported, but the value is kept
                    if !elem.accepts(&value) {
                        self.report(
                            SemanticError::ArrayElemWrongType {
                                expected: elem.to_string(),
                                found: value.type_label(),
                            },
                            element.pos,
                        );
                    }
                    value
                }
            };

            values.push(value);
        }

        if values.len() > size {
            self.report(ValueError::TooManyElements(size, values.len()).into(), pos);
            values.truncate(size);
        }

        let array = ArrayType::from_elements(size, elem, values).at(pos)?;
        Ok(RuntimeVal::from_array(array))
    }

    pub(super) fn evaluate_indices(&mut self, indices: &[Expr], env: &EnvRef) -> Exec<Vec<i64>> {
        let mut evaluated = Vec::with_capacity(indices.len());

        for index in indices {
            let value = self.evaluate_single(index, env)?;
            evaluated.push(value.as_index().at(index.pos)?);
        }

        Ok(evaluated)
    }

    // a[i][j]
    pub(super) fn index(
        &mut self,
        name: &str,
        indices: &[Expr],
        env: &EnvRef,
        pos: Position,
    ) -> Exec<RuntimeVal> {
        let owner = Env::resolve(env, name)
            .ok_or_else(|| EnvError::UndeclaredVar(name.to_string()))
            .at(pos)?;

        let indices = self.evaluate_indices(indices, env)?;
        let (array, _) = self.array_behind(name, owner, pos)?;
        let (array, last) = walk_to_last(array, &indices).at(pos)?;

        let value = array.borrow().get(last).at(pos);
        value
    }

    /// Storage of the array held by a variable. A pointer to an array is
    /// followed one level, the holder is then the pointed variable.
    pub(super) fn array_behind(
        &self,
        name: &str,
        owner: EnvRef,
        pos: Position,
    ) -> Exec<(Rc<RefCell<ArrayType>>, (EnvRef, String))> {
        let value = owner
            .borrow()
            .get(name)
            .ok_or_else(|| EnvError::UndeclaredVar(name.to_string()))
            .at(pos)?;

        match value {
            RuntimeVal::Array(array) => Ok((array, (owner, name.to_string()))),
            RuntimeVal::Pointer { .. } => {
                let (target_owner, target) = self.follow_pointer(name, &value, pos)?;
                let pointee = target_owner.borrow().get(&target);

                match pointee {
                    Some(RuntimeVal::Array(array)) => Ok((array, (target_owner, target))),
                    Some(other) => {
                        semantic(ValueError::NonArrayIndexing(other.kind()).into(), pos)
                    }
                    None => semantic(EnvError::UndeclaredVar(target).into(), pos),
                }
            }
            other => semantic(ValueError::NonArrayIndexing(other.kind()).into(), pos),
        }
    }
}
