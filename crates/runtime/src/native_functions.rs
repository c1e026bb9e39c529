use chrono::Local;
use thiserror::Error;

use super::values::{RuntimeVal, ValueKind};

#[derive(Debug, PartialEq, Error)]
pub enum NativeFnError {
    #[error("function {0}: expected {1} arguments, found {2}")]
    WrongArgNumber(&'static str, usize, usize),

    #[error("function {0}: argument {1} should be of type {2}, found '{3}'")]
    WrongArgType(&'static str, usize, &'static str, ValueKind),
}

// Built-ins never write to a stream, output lines go to the buffer
pub type NativeFn = fn(&[RuntimeVal], &mut Vec<String>) -> Result<RuntimeVal, NativeFnError>;

pub fn lookup(name: &str) -> Option<NativeFn> {
    let func: NativeFn = match name {
        "fmt.Println" | "fmt.Print" | "println" | "print" => native_print,
        "len" => native_len,
        "substr" => native_substr,
        "now" => native_now,
        "typeOf" => native_type_of,
        _ => return None,
    };

    Some(func)
}

// Display the values on one line, separated by a space
pub fn native_print(args: &[RuntimeVal], output: &mut Vec<String>) -> Result<RuntimeVal, NativeFnError> {
    let line: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    output.push(line.join(" "));

    Ok(RuntimeVal::Nil)
}

// Code points for strings, first dimension for arrays
pub fn native_len(args: &[RuntimeVal], _: &mut Vec<String>) -> Result<RuntimeVal, NativeFnError> {
    check_args_number("len", args, 1)?;

    let len = match &args[0] {
        RuntimeVal::Str(s) => s.chars().count(),
        RuntimeVal::Array(arr) => arr.borrow().size,
        _ => return Ok(RuntimeVal::Nil),
    };

    Ok(RuntimeVal::Int32(i32::try_from(len).unwrap_or(i32::MAX)))
}

// substr(s, start, length), unicode aware. An invalid range gives nil.
pub fn native_substr(args: &[RuntimeVal], _: &mut Vec<String>) -> Result<RuntimeVal, NativeFnError> {
    check_args_number("substr", args, 3)?;

    let RuntimeVal::Str(s) = &args[0] else {
        return Err(NativeFnError::WrongArgType("substr", 1, "string", args[0].kind()));
    };
    let RuntimeVal::Int32(start) = args[1] else {
        return Err(NativeFnError::WrongArgType("substr", 2, "int32", args[1].kind()));
    };
    let RuntimeVal::Int32(length) = args[2] else {
        return Err(NativeFnError::WrongArgType("substr", 3, "int32", args[2].kind()));
    };

    let (Ok(start), Ok(length)) = (usize::try_from(start), usize::try_from(length)) else {
        return Ok(RuntimeVal::Nil);
    };

    if start + length > s.chars().count() {
        return Ok(RuntimeVal::Nil);
    }

    Ok(RuntimeVal::Str(s.chars().skip(start).take(length).collect()))
}

pub fn native_now(args: &[RuntimeVal], _: &mut Vec<String>) -> Result<RuntimeVal, NativeFnError> {
    check_args_number("now", args, 0)?;

    Ok(RuntimeVal::Str(
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    ))
}

// Kind of the value, arrays are shown as []<element kind>
pub fn native_type_of(args: &[RuntimeVal], _: &mut Vec<String>) -> Result<RuntimeVal, NativeFnError> {
    check_args_number("typeOf", args, 1)?;

    let label = match &args[0] {
        RuntimeVal::Array(arr) => format!("[]{}", arr.borrow().elem_kind()),
        other => other.kind().to_string(),
    };

    Ok(RuntimeVal::Str(label))
}

// --------
// Helpers
// --------
fn check_args_number(
    fn_name: &'static str,
    args: &[RuntimeVal],
    nb_expected: usize,
) -> Result<(), NativeFnError> {
    if args.len() != nb_expected {
        return Err(NativeFnError::WrongArgNumber(
            fn_name,
            nb_expected,
            args.len(),
        ));
    }

    Ok(())
}
