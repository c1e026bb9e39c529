use std::cell::RefCell;
use std::rc::Rc;

use frontend::ast::{AssignOp, AssignTarget, Expr, IncDecOp};
use tools::errors::Position;

use super::signal::{semantic, At, Exec, Unwind};
use super::{Interpreter, RuntimeError, SemanticError};
use crate::environment::{Env, EnvError, EnvRef};
use crate::values::{ArrayType, RuntimeVal, ValueError, ValueKind};

/// A storage slot an assignment can write to.
pub(super) enum Place {
    // Variable, in the frame that defines it
    Var { owner: EnvRef, name: String },
    // Array element. The holder is the variable the array was reached
    // through, its symbol is refreshed after a write.
    Element {
        array: Rc<RefCell<ArrayType>>,
        index: i64,
        holder: (EnvRef, String),
    },
}

impl Interpreter {
    pub(super) fn assign(
        &mut self,
        target: &AssignTarget,
        op: AssignOp,
        value: &Expr,
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        let place = self.place_of(target, env, pos)?;
        let rhs = self.evaluate_single(value, env)?;
        let current = self.read(&place, pos)?;

        let new = match op {
            AssignOp::Assign => {
                let slot = self.slot_kind(&place, &current);
                match coerce(slot, rhs.clone()) {
                    Some(new) => new,
                    None => {
                        return semantic(
                            SemanticError::TypeMismatch {
                                name: target.name().to_string(),
                                expected: slot_label(slot, &current),
                                found: rhs.type_label(),
                            },
                            pos,
                        )
                    }
                }
            }
            AssignOp::Compound(op) => keep_rune(&current, current.calculate(&rhs, op).at(pos)?),
        };

        self.write(&place, new, pos)
    }

    pub(super) fn inc_dec(
        &mut self,
        target: &AssignTarget,
        op: IncDecOp,
        env: &EnvRef,
        pos: Position,
    ) -> Exec<()> {
        let place = self.place_of(target, env, pos)?;

        let step = match op {
            IncDecOp::Inc => 1,
            IncDecOp::Dec => -1,
        };
        let new = match self.read(&place, pos)? {
            RuntimeVal::Int32(nb) => RuntimeVal::Int32(nb.wrapping_add(step)),
            RuntimeVal::Rune(code) => RuntimeVal::Rune(code.wrapping_add(step)),
            other => {
                let symbol = match op {
                    IncDecOp::Inc => "++",
                    IncDecOp::Dec => "--",
                };
                return semantic(SemanticError::InvalidIncDec(symbol, other.kind()), pos);
            }
        };

        self.write(&place, new, pos)
    }

    pub(super) fn place_of(
        &mut self,
        target: &AssignTarget,
        env: &EnvRef,
        pos: Position,
    ) -> Exec<Place> {
        match target {
            AssignTarget::Identifier(name) => Ok(Place::Var {
                owner: self.writable_owner(name, env, pos)?,
                name: name.clone(),
            }),
            // The write goes to the variable the pointer designates
            AssignTarget::Deref(name) => {
                let pointer = self.lookup(name, env, pos)?;
                let (owner, name) = self.follow_pointer(name, &pointer, pos)?;

                Ok(Place::Var { owner, name })
            }
            AssignTarget::Index { name, indices } => {
                let owner = self.writable_owner(name, env, pos)?;
                let indices = self.evaluate_indices(indices, env)?;
                let (array, holder) = self.array_behind(name, owner, pos)?;
                let (array, index) = walk_to_last(array, &indices).at(pos)?;

                Ok(Place::Element {
                    array,
                    index,
                    holder,
                })
            }
        }
    }

    pub(super) fn read(&self, place: &Place, pos: Position) -> Exec<RuntimeVal> {
        match place {
            Place::Var { owner, name } => owner
                .borrow()
                .get(name)
                .ok_or_else(|| EnvError::UndeclaredVar(name.clone()))
                .at(pos),
            Place::Element { array, index, .. } => array.borrow().get(*index).at(pos),
        }
    }

    // Kind a plain `=` must keep: the declared one for variables, the
    // element type for array elements
    fn slot_kind(&self, place: &Place, current: &RuntimeVal) -> ValueKind {
        match place {
            Place::Var { owner, name } => owner.borrow().kind_of(name),
            Place::Element { array, .. } => Some(array.borrow().elem_type.kind()),
        }
        .unwrap_or(current.kind())
    }

    pub(super) fn write(&mut self, place: &Place, value: RuntimeVal, pos: Position) -> Exec<()> {
        match place {
            Place::Var { owner, name } => self.store_var(owner, name, value, pos),
            Place::Element {
                array,
                index,
                holder: (owner, name),
            } => {
                // An array never ends up inside its own storage
                if let RuntimeVal::Array(stored) = &value {
                    if Rc::ptr_eq(stored, array) || stored.borrow().holds(array) {
                        return semantic(SemanticError::ArrayInsideItself(name.clone()), pos);
                    }
                }

                array.borrow_mut().set(*index, value).at(pos)?;
                self.refresh_symbol(owner, name);

                Ok(())
            }
        }
    }

    /// Sets the variable and refreshes the symbol of its declaration.
    pub(super) fn store_var(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: RuntimeVal,
        pos: Position,
    ) -> Exec<()> {
        env.borrow_mut().set(name, value).at(pos)?;
        self.refresh_symbol(env, name);

        Ok(())
    }

    fn refresh_symbol(&mut self, env: &EnvRef, name: &str) {
        let env = env.borrow();

        if let (Some(id), Some(value)) = (env.symbol_of(name), env.get(name)) {
            self.symbols.update(id, &value);
        }
    }

    // Frame defining a name that may be written to
    fn writable_owner(&self, name: &str, env: &EnvRef, pos: Position) -> Exec<EnvRef> {
        let owner = Env::resolve(env, name)
            .ok_or_else(|| EnvError::AssignToUndeclared(name.to_string()))
            .at(pos)?;

        if owner.borrow().is_const(name) {
            return semantic(EnvError::AssignToConst(name.to_string()).into(), pos);
        }

        Ok(owner)
    }

    /// The frame and name a pointer designates. A pointer whose frame is
    /// gone breaks the model and stops the run.
    pub(super) fn follow_pointer(
        &self,
        label: &str,
        pointer: &RuntimeVal,
        pos: Position,
    ) -> Exec<(EnvRef, String)> {
        match pointer {
            RuntimeVal::Pointer { name, env } => match env.upgrade() {
                Some(owner) if owner.borrow().has_local(name) => Ok((owner, name.clone())),
                _ => Err(Unwind::Fatal(RuntimeError::DanglingPointer(name.clone()), pos)),
            },
            RuntimeVal::Nil => semantic(SemanticError::NilDeref, pos),
            other => semantic(
                SemanticError::DerefNonPointer(label.to_string(), other.kind()),
                pos,
            ),
        }
    }
}

/// Kind rule of a plain `=`: same kind, except an int32 stored into a
/// float32. Nil fits every slot, a nil slot also takes a pointer.
pub(super) fn coerce(slot: ValueKind, value: RuntimeVal) -> Option<RuntimeVal> {
    match (slot, value) {
        (_, RuntimeVal::Nil) => Some(RuntimeVal::Nil),
        (ValueKind::Float32, RuntimeVal::Int32(nb)) => Some(RuntimeVal::Float32(nb as f32)),
        (ValueKind::Nil, value @ RuntimeVal::Pointer { .. }) => Some(value),
        (slot, value) if slot == value.kind() => Some(value),
        _ => None,
    }
}

// Label of the expected type in a mismatch: the current value tells more
// than the kind, unless it is nil
pub(super) fn slot_label(slot: ValueKind, current: &RuntimeVal) -> String {
    match current.kind() == slot {
        true => current.type_label(),
        false => slot.to_string(),
    }
}

// Arithmetic on a rune gives an int32, a rune variable stays a rune
fn keep_rune(current: &RuntimeVal, value: RuntimeVal) -> RuntimeVal {
    match (current, value) {
        (RuntimeVal::Rune(_), RuntimeVal::Int32(nb)) => RuntimeVal::Rune(nb),
        (_, value) => value,
    }
}

/// Follows every index but the last one, which is only bounds checked.
pub(super) fn walk_to_last(
    array: Rc<RefCell<ArrayType>>,
    indices: &[i64],
) -> Result<(Rc<RefCell<ArrayType>>, i64), ValueError> {
    let mut current = array;

    let Some((last, path)) = indices.split_last() else {
        return Err(ValueError::NonArrayIndexing(ValueKind::Array));
    };

    for index in path {
        let next = current.borrow().get(*index)?;
        current = match next {
            RuntimeVal::Array(inner) => inner,
            other => return Err(ValueError::NonArrayIndexing(other.kind())),
        };
    }

    current.borrow().get(*last)?;
    Ok((current, *last))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{errors_of, interpret, output_of};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coerce_rules() {
        assert_eq!(
            coerce(ValueKind::Float32, RuntimeVal::Int32(2)),
            Some(RuntimeVal::Float32(2.))
        );
        assert_eq!(coerce(ValueKind::Int32, RuntimeVal::Nil), Some(RuntimeVal::Nil));
        assert_eq!(coerce(ValueKind::Array, RuntimeVal::Nil), Some(RuntimeVal::Nil));
        assert_eq!(coerce(ValueKind::Int32, RuntimeVal::Float32(1.)), None);
        assert_eq!(coerce(ValueKind::Nil, RuntimeVal::Int32(1)), None);
    }

    #[test]
    fn nil_result_fits_a_typed_variable() {
        let interpreter = interpret(
            "func main() {
                var z int32 = 1
                z = 5 / 0
                println(z)
                z = 3
                z = \"three\"
                println(z)
            }",
        );

        let errors = interpreter.diagnostics().entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].description,
            "cannot use value of type 'string' as 'int32' for 'z'"
        );
        assert_eq!(interpreter.output(), &["nil".to_string(), "3".to_string()]);
    }

    #[test]
    fn element_store_checks_the_element_type() {
        let errors = errors_of(
            "func main() {
                a := [2]int32{}
                a[0] = \"x\"
                a[1] = 2.5
            }",
        );

        let descriptions: Vec<_> = errors.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "cannot use value of type 'string' as 'int32' for 'a'",
                "cannot use value of type 'float32' as 'int32' for 'a'",
            ]
        );
    }

    #[test]
    fn array_cannot_be_stored_inside_itself() {
        let interpreter = interpret(
            "func main() {
                var m [2][2]int32
                m[0] = m
                var c [2][2][2]int32
                inner := c[1]
                inner[0] = c
                m[1] = [2]int32{7, 8}
                println(len(m), m)
            }",
        );

        let errors = interpreter.diagnostics().entries();
        let descriptions: Vec<_> = errors.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "cannot store array 'm' inside itself",
                "cannot store array 'inner' inside itself",
            ]
        );
        assert_eq!(interpreter.output(), &["2 [[0 0] [7 8]]".to_string()]);
    }

    #[test]
    fn pointer_round_trip() {
        let output = output_of(
            "func main() {
                x := 1
                p := &x
                *p = 5
                *p += 2
                println(x, *p, typeOf(x))
            }",
        );

        assert_eq!(output, vec!["7 7 int32".to_string()]);
    }

    #[test]
    fn pointer_write_refreshes_the_pointee_symbol() {
        let interpreter = interpret(
            "func main() {
                x := 1
                p := &x
                *p = 42
            }",
        );

        let symbols = interpreter.symbols().symbols();
        assert_eq!(symbols[1].identifier, "x");
        assert_eq!(symbols[1].value, "42");
        assert_eq!(symbols[2].identifier, "p");
        assert_eq!(symbols[2].type_label, "*int32");
        assert_eq!(symbols[2].value, "&x");
    }

    #[test]
    fn rune_arithmetic_keeps_the_rune() {
        let output = output_of(
            "func main() {
                var c rune = 'a'
                c++
                c += 1
                println(c)
            }",
        );

        assert_eq!(output, vec!["c".to_string()]);
    }

    #[test]
    fn inc_dec_needs_an_integer() {
        let errors = errors_of(
            "func main() {
                s := \"a\"
                s++
            }",
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].description,
            "invalid operation: ++ requires an int32 or rune variable, found 'string'"
        );
    }

    #[test]
    fn deref_of_a_non_pointer() {
        let errors = errors_of(
            "func main() {
                x := 1
                *x = 2
            }",
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "invalid indirect of 'x' of type 'int32'");
    }

    #[test]
    fn assignment_to_undeclared() {
        let errors = errors_of("func main() {\n ghost = 1\n}");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "assignment to undeclared variable: 'ghost'");
        assert_eq!((errors[0].line, errors[0].column), (2, 2));
    }
}
