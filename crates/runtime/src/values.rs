use std::cell::RefCell;
use std::fmt::Display;
use std::rc::{Rc, Weak};

mod array;
mod value_errors;
mod var_type;

pub use array::ArrayType;
pub use value_errors::ValueError;
pub use var_type::VarType;

use crate::environment::Env;
use frontend::ast::BinaryOp;

#[derive(Clone, Debug)]
pub enum RuntimeVal {
    Nil,
    Int32(i32),
    Float32(f32),
    Bool(bool),
    Str(String),
    // A code point, kept as an integer so it takes part in arithmetic
    Rune(i32),
    // Shared and mutable in place: assigning an array does not copy it
    Array(Rc<RefCell<ArrayType>>),
    // A storage slot, not a value. Reads go through the environment live.
    Pointer {
        name: String,
        env: Weak<RefCell<Env>>,
    },
    // Only carries the results of a multi-value return to the call site
    Multi(Vec<RuntimeVal>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Nil,
    Int32,
    Float32,
    Bool,
    String,
    Rune,
    Array,
    Pointer,
    Multi,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ValueKind::Nil => "nil",
            ValueKind::Int32 => "int32",
            ValueKind::Float32 => "float32",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Rune => "rune",
            ValueKind::Array => "array",
            ValueKind::Pointer => "pointer",
            ValueKind::Multi => "multi",
        };

        write!(f, "{label}")
    }
}

impl Display for RuntimeVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeVal::Nil => write!(f, "nil"),
            RuntimeVal::Int32(nb) => write!(f, "{nb}"),
            RuntimeVal::Float32(nb) => write!(f, "{nb}"),
            RuntimeVal::Bool(b) => write!(f, "{b}"),
            RuntimeVal::Str(s) => write!(f, "{s}"),
            RuntimeVal::Rune(code) => write!(f, "{}", rune_to_char(*code)),
            RuntimeVal::Array(arr) => {
                let elements: Vec<String> = arr.borrow().val.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", elements.join(" "))
            }
            RuntimeVal::Pointer { name, .. } => write!(f, "&{name}"),
            RuntimeVal::Multi(values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", values.join(" "))
            }
        }
    }
}

impl PartialEq for RuntimeVal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeVal::Nil, RuntimeVal::Nil) => true,
            (RuntimeVal::Int32(a), RuntimeVal::Int32(b)) => a == b,
            (RuntimeVal::Float32(a), RuntimeVal::Float32(b)) => a == b,
            (RuntimeVal::Bool(a), RuntimeVal::Bool(b)) => a == b,
            (RuntimeVal::Str(a), RuntimeVal::Str(b)) => a == b,
            (RuntimeVal::Rune(a), RuntimeVal::Rune(b)) => a == b,
            (RuntimeVal::Array(a), RuntimeVal::Array(b)) => {
                Rc::ptr_eq(a, b) || a.borrow().val == b.borrow().val
            }
            (
                RuntimeVal::Pointer { name: n1, env: e1 },
                RuntimeVal::Pointer { name: n2, env: e2 },
            ) => n1 == n2 && e1.ptr_eq(e2),
            (RuntimeVal::Multi(a), RuntimeVal::Multi(b)) => a == b,
            _ => false,
        }
    }
}

pub fn rune_to_char(code: i32) -> char {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

// Numeric view of a value used by the promotion rules
#[derive(Clone, Copy)]
enum Num {
    Int(i32),
    Float(f32),
}

impl RuntimeVal {
    pub fn from_array(arr: ArrayType) -> Self {
        RuntimeVal::Array(Rc::new(RefCell::new(arr)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            RuntimeVal::Nil => ValueKind::Nil,
            RuntimeVal::Int32(_) => ValueKind::Int32,
            RuntimeVal::Float32(_) => ValueKind::Float32,
            RuntimeVal::Bool(_) => ValueKind::Bool,
            RuntimeVal::Str(_) => ValueKind::String,
            RuntimeVal::Rune(_) => ValueKind::Rune,
            RuntimeVal::Array(_) => ValueKind::Array,
            RuntimeVal::Pointer { .. } => ValueKind::Pointer,
            RuntimeVal::Multi(_) => ValueKind::Multi,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, RuntimeVal::Nil)
    }

    /// Arrays are always truthy, even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeVal::Nil => false,
            RuntimeVal::Bool(b) => *b,
            RuntimeVal::Int32(nb) => *nb != 0,
            RuntimeVal::Float32(nb) => *nb != 0.,
            RuntimeVal::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Type as shown in the symbol table: `int32`, `[3]int32`, `*int32`...
    pub fn type_label(&self) -> String {
        match self {
            RuntimeVal::Array(arr) => {
                let arr = arr.borrow();
                VarType::Array {
                    size: arr.size,
                    elem: Box::new(arr.elem_type.clone()),
                }
                .to_string()
            }
            RuntimeVal::Pointer { name, env } => match env.upgrade() {
                Some(env) => match env.borrow().get(name) {
                    Some(target) => format!("*{}", target.type_label()),
                    None => "pointer".into(),
                },
                None => "pointer".into(),
            },
            _ => self.kind().to_string(),
        }
    }

    // Arrays are copied recursively, everything else is immutable
    pub fn deep_copy(&self) -> RuntimeVal {
        match self {
            RuntimeVal::Array(arr) => RuntimeVal::from_array(arr.borrow().deep_copy()),
            _ => self.clone(),
        }
    }

    pub fn as_index(&self) -> Result<i64, ValueError> {
        match self {
            RuntimeVal::Int32(nb) | RuntimeVal::Rune(nb) => Ok(i64::from(*nb)),
            _ => Err(ValueError::NonIntegerIndex(self.kind())),
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            RuntimeVal::Int32(nb) | RuntimeVal::Rune(nb) => Some(Num::Int(*nb)),
            RuntimeVal::Float32(nb) => Some(Num::Float(*nb)),
            _ => None,
        }
    }

    /// Binary operators. Arithmetic on a `nil` operand gives `nil`, invalid
    /// arithmetic is an error. Comparisons never fail, mismatched kinds
    /// simply compare as false.
    pub fn calculate(&self, rhs: &RuntimeVal, op: BinaryOp) -> Result<RuntimeVal, ValueError> {
        match op {
            BinaryOp::Eq => Ok(RuntimeVal::Bool(self.equals(rhs).unwrap_or(false))),
            BinaryOp::NotEq => Ok(RuntimeVal::Bool(self.equals(rhs).is_some_and(|eq| !eq))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                Ok(RuntimeVal::Bool(self.compare(rhs, op)))
            }
            _ if self.is_nil() || rhs.is_nil() => Ok(RuntimeVal::Nil),
            BinaryOp::Mod => self.modulo(rhs),
            _ => self.arithmetic(rhs, op),
        }
    }

    fn invalid(&self, rhs: &RuntimeVal, op: BinaryOp) -> ValueError {
        ValueError::InvalidOperation {
            op: op.symbol(),
            lhs: self.kind(),
            rhs: rhs.kind(),
        }
    }

    // + - * /
    fn arithmetic(&self, rhs: &RuntimeVal, op: BinaryOp) -> Result<RuntimeVal, ValueError> {
        match (self, rhs) {
            (RuntimeVal::Str(a), RuntimeVal::Str(b)) if op == BinaryOp::Add => {
                return Ok(RuntimeVal::Str(format!("{a}{b}")))
            }
            (RuntimeVal::Str(s), RuntimeVal::Int32(n)) | (RuntimeVal::Int32(n), RuntimeVal::Str(s))
                if op == BinaryOp::Mul =>
            {
                let count = usize::try_from(*n).map_err(|_| ValueError::NegativeRepeat(*n))?;
                return Ok(RuntimeVal::Str(s.repeat(count)));
            }
            // A rune only mixes with an int32
            (RuntimeVal::Rune(_), RuntimeVal::Rune(_) | RuntimeVal::Float32(_))
            | (RuntimeVal::Float32(_), RuntimeVal::Rune(_)) => return Err(self.invalid(rhs, op)),
            _ => {}
        }

        let (Some(lhs_nb), Some(rhs_nb)) = (self.as_num(), rhs.as_num()) else {
            return Err(self.invalid(rhs, op));
        };

        // Division by zero yields nil
        if op == BinaryOp::Div && matches!(rhs_nb, Num::Int(0)) {
            return Ok(RuntimeVal::Nil);
        }
        if op == BinaryOp::Div && matches!(rhs_nb, Num::Float(f) if f == 0.) {
            return Ok(RuntimeVal::Nil);
        }

        let res = match (lhs_nb, rhs_nb) {
            (Num::Int(a), Num::Int(b)) => RuntimeVal::Int32(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                // Truncates toward zero
                _ => a.wrapping_div(b),
            }),
            (a, b) => {
                let (a, b) = (a.as_f32(), b.as_f32());
                RuntimeVal::Float32(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    _ => a / b,
                })
            }
        };

        Ok(res)
    }

    // Only int32 and rune operands, modulo by zero yields nil
    fn modulo(&self, rhs: &RuntimeVal) -> Result<RuntimeVal, ValueError> {
        match (self, rhs) {
            (
                RuntimeVal::Int32(a) | RuntimeVal::Rune(a),
                RuntimeVal::Int32(b) | RuntimeVal::Rune(b),
            ) => {
                if *b == 0 {
                    return Ok(RuntimeVal::Nil);
                }

                Ok(RuntimeVal::Int32(a.wrapping_rem(*b)))
            }
            _ => Err(self.invalid(rhs, BinaryOp::Mod)),
        }
    }

    // None when the kinds can not be compared
    fn equals(&self, rhs: &RuntimeVal) -> Option<bool> {
        match (self, rhs) {
            (RuntimeVal::Str(a), RuntimeVal::Str(b)) => Some(a == b),
            (RuntimeVal::Bool(a), RuntimeVal::Bool(b)) => Some(a == b),
            _ => match (self.as_num(), rhs.as_num()) {
                (Some(a), Some(b)) => Some(a.as_f64() == b.as_f64()),
                _ => None,
            },
        }
    }

    fn compare(&self, rhs: &RuntimeVal, op: BinaryOp) -> bool {
        let ordering = match (self, rhs) {
            // Byte-wise, like the lexicographic comparison of Go strings
            (RuntimeVal::Str(a), RuntimeVal::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => match (self.as_num(), rhs.as_num()) {
                (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
                _ => None,
            },
        };

        let Some(ordering) = ordering else {
            return false;
        };

        match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::LtEq => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        }
    }
}

impl Num {
    fn as_f32(self) -> f32 {
        match self {
            Num::Int(nb) => nb as f32,
            Num::Float(nb) => nb,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(nb) => f64::from(nb),
            Num::Float(nb) => f64::from(nb),
        }
    }
}
