use std::cell::RefCell;
use std::rc::Rc;

use super::{RuntimeVal, ValueError, VarType};

/// Backing storage of an array value. It is shared between every binding
/// referring to it, only function arguments get a deep copy.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayType {
    pub elem_type: VarType,
    pub size: usize,
    pub val: Vec<RuntimeVal>,
}

impl ArrayType {
    pub fn with_defaults(size: usize, elem_type: VarType) -> Self {
        let val = (0..size).map(|_| elem_type.default_value()).collect();

        Self {
            elem_type,
            size,
            val,
        }
    }

    // Missing trailing elements are filled with the zero value
    pub fn from_elements(
        size: usize,
        elem_type: VarType,
        mut elements: Vec<RuntimeVal>,
    ) -> Result<Self, ValueError> {
        if elements.len() > size {
            return Err(ValueError::TooManyElements(size, elements.len()));
        }

        while elements.len() < size {
            elements.push(elem_type.default_value());
        }

        Ok(Self {
            elem_type,
            size,
            val: elements,
        })
    }

    pub fn get(&self, index: i64) -> Result<RuntimeVal, ValueError> {
        let id = self.check_and_get_index(index)?;

        Ok(self.val[id].clone())
    }

    pub fn set(&mut self, index: i64, value: RuntimeVal) -> Result<(), ValueError> {
        let id = self.check_and_get_index(index)?;
        self.val[id] = value;

        Ok(())
    }

    pub fn deep_copy(&self) -> Self {
        Self {
            elem_type: self.elem_type.clone(),
            size: self.size,
            val: self.val.iter().map(RuntimeVal::deep_copy).collect(),
        }
    }

    /// Whether `storage` is reachable through the elements, at any depth.
    pub fn holds(&self, storage: &Rc<RefCell<ArrayType>>) -> bool {
        self.val.iter().any(|elem| match elem {
            RuntimeVal::Array(inner) => Rc::ptr_eq(inner, storage) || inner.borrow().holds(storage),
            _ => false,
        })
    }

    // The element tag used by typeOf: primitive name, or "array"
    pub fn elem_kind(&self) -> String {
        self.elem_type.kind().to_string()
    }

    fn check_and_get_index(&self, index: i64) -> Result<usize, ValueError> {
        if index < 0 || index as usize >= self.val.len() {
            return Err(ValueError::ArrayOverIndexing(index, self.val.len()));
        }

        Ok(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_is_back_filled() {
        let arr = ArrayType::from_elements(
            4,
            VarType::Int32,
            vec![RuntimeVal::Int32(1), RuntimeVal::Int32(2)],
        )
        .unwrap();

        assert_eq!(
            arr.val,
            vec![
                RuntimeVal::Int32(1),
                RuntimeVal::Int32(2),
                RuntimeVal::Int32(0),
                RuntimeVal::Int32(0)
            ]
        );
    }

    #[test]
    fn too_many_elements() {
        assert_eq!(
            ArrayType::from_elements(1, VarType::Bool, vec![RuntimeVal::Bool(true); 2]),
            Err(ValueError::TooManyElements(1, 2))
        );
    }

    #[test]
    fn out_of_range_access() {
        let mut arr = ArrayType::with_defaults(3, VarType::String);

        assert_eq!(arr.get(3), Err(ValueError::ArrayOverIndexing(3, 3)));
        assert_eq!(
            arr.set(-1, RuntimeVal::Str("a".into())),
            Err(ValueError::ArrayOverIndexing(-1, 3))
        );
        assert_eq!(arr.get(2), Ok(RuntimeVal::Str(String::new())));
    }

    #[test]
    fn deep_copy_detaches_nested_arrays() {
        let inner = RuntimeVal::from_array(ArrayType::with_defaults(2, VarType::Int32));
        let outer = ArrayType::from_elements(
            1,
            VarType::Array {
                size: 2,
                elem: Box::new(VarType::Int32),
            },
            vec![inner.clone()],
        )
        .unwrap();

        let copy = outer.deep_copy();
        if let RuntimeVal::Array(arr) = &copy.val[0] {
            arr.borrow_mut().val[0] = RuntimeVal::Int32(7);
        }

        if let RuntimeVal::Array(arr) = &inner {
            assert_eq!(arr.borrow().val[0], RuntimeVal::Int32(0));
        }
    }

    #[test]
    fn holds_looks_through_every_level() {
        let RuntimeVal::Array(leaf) =
            RuntimeVal::from_array(ArrayType::with_defaults(2, VarType::Int32))
        else {
            panic!("expected an array");
        };
        let row = ArrayType::from_elements(
            1,
            VarType::Array {
                size: 2,
                elem: Box::new(VarType::Int32),
            },
            vec![RuntimeVal::Array(leaf.clone())],
        )
        .unwrap();
        let RuntimeVal::Array(row) = RuntimeVal::from_array(row) else {
            panic!("expected an array");
        };
        let grid = ArrayType::from_elements(
            1,
            row.borrow().elem_type.clone(),
            vec![RuntimeVal::Array(row.clone())],
        )
        .unwrap();

        assert!(grid.holds(&row));
        assert!(grid.holds(&leaf));
        assert!(!leaf.borrow().holds(&row));
    }
}
