use std::fmt::Display;

use super::{ArrayType, RuntimeVal, ValueKind};

/// A declared type once array sizes have been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum VarType {
    Int32,
    Float32,
    Bool,
    String,
    Rune,
    Array { size: usize, elem: Box<VarType> },
    Pointer(Box<VarType>),
}

impl Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Int32 => write!(f, "int32"),
            VarType::Float32 => write!(f, "float32"),
            VarType::Bool => write!(f, "bool"),
            VarType::String => write!(f, "string"),
            VarType::Rune => write!(f, "rune"),
            VarType::Array { size, elem } => write!(f, "[{size}]{elem}"),
            VarType::Pointer(inner) => write!(f, "*{inner}"),
        }
    }
}

impl VarType {
    pub fn kind(&self) -> ValueKind {
        match self {
            VarType::Int32 => ValueKind::Int32,
            VarType::Float32 => ValueKind::Float32,
            VarType::Bool => ValueKind::Bool,
            VarType::String => ValueKind::String,
            VarType::Rune => ValueKind::Rune,
            VarType::Array { .. } => ValueKind::Array,
            VarType::Pointer(_) => ValueKind::Pointer,
        }
    }

    // Zero value of the type. Nested arrays are all distinct storages.
    pub fn default_value(&self) -> RuntimeVal {
        match self {
            VarType::Int32 => RuntimeVal::Int32(0),
            VarType::Float32 => RuntimeVal::Float32(0.),
            VarType::Bool => RuntimeVal::Bool(false),
            VarType::String => RuntimeVal::Str(String::new()),
            VarType::Rune => RuntimeVal::Rune(0),
            VarType::Array { size, elem } => {
                RuntimeVal::from_array(ArrayType::with_defaults(*size, (**elem).clone()))
            }
            VarType::Pointer(_) => RuntimeVal::Nil,
        }
    }

    /// Top level kind check only, the element type and the size of arrays
    /// are not compared. `nil` fits pointers.
    pub fn accepts(&self, val: &RuntimeVal) -> bool {
        match (self, val) {
            (VarType::Pointer(_), RuntimeVal::Nil) => true,
            _ => self.kind() == val.kind(),
        }
    }

    /// The one implicit conversion of the language, int32 to float32. An
    /// int32 may also initialize a rune.
    pub fn convert(&self, val: RuntimeVal) -> RuntimeVal {
        match (self, val) {
            (VarType::Float32, RuntimeVal::Int32(nb)) => RuntimeVal::Float32(nb as f32),
            (VarType::Rune, RuntimeVal::Int32(nb)) => RuntimeVal::Rune(nb),
            (_, val) => val,
        }
    }
}
