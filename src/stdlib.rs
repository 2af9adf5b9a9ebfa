// ABOUTME: The fixed standard library exposed to TL programs

use crate::error::EvalError;
use crate::value::{Sequence, Value};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Resolves a bare (non-dotted) name against the standard library: `List`
/// the constructor, and `Console` as a namespace object (so a program may
/// bind it to a variable even though the common path is a direct
/// `Console.WriteLine(...)` call).
pub fn resolve_bare(name: &str) -> Option<Value> {
    match name {
        "List" => Some(Value::Builtin("List", list_ctor)),
        "Console" => Some(console_namespace()),
        _ => None,
    }
}

/// Resolves a dotted name whose first segment is `Console`.
pub fn resolve_dotted(name: &str) -> Option<Value> {
    let (head, rest) = name.split_once('.')?;
    if head != "Console" {
        return None;
    }
    match rest {
        "WriteLine" => Some(Value::Builtin("Console.WriteLine", console_write_line)),
        "ReadLine" => Some(Value::Builtin("Console.ReadLine", console_read_line)),
        _ => None,
    }
}

fn console_namespace() -> Value {
    let mut members = HashMap::new();
    members.insert(
        "WriteLine".to_string(),
        Value::Builtin("Console.WriteLine", console_write_line),
    );
    members.insert(
        "ReadLine".to_string(),
        Value::Builtin("Console.ReadLine", console_read_line),
    );
    Value::Namespace(Rc::new(members))
}

/// Writes its arguments separated by a single space, followed by a newline.
fn console_write_line(args: &[Value]) -> Result<Value, EvalError> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "{}", rendered.join(" "));
    Ok(Value::Null)
}

/// Reads one line from standard input, stripping its terminator. Returns
/// the empty string at end-of-input.
fn console_read_line(args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity_error("Console.ReadLine", "0", args.len()));
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Ok(Value::Str(String::new())),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(Value::Str(line))
        }
    }
}

fn list_ctor(args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity_error("List", "0", args.len()));
    }
    Ok(Value::new_sequence())
}

/// Dispatches `xs.push_back(x)`, `xs.add(x)`, and `xs.size()` — the three
/// Sequence member functions reached through the Call path rather than
/// native attribute lookup (spec.md 4.3 / 9).
pub fn call_sequence_method(seq: &Sequence, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    match method {
        "push_back" | "add" => {
            if args.len() != 1 {
                return Err(EvalError::arity_error(method, "1", args.len()));
            }
            seq.borrow_mut().push(args[0].clone());
            Ok(Value::Null)
        }
        "size" => {
            if !args.is_empty() {
                return Err(EvalError::arity_error(method, "0", args.len()));
            }
            Ok(Value::Integer(seq.borrow().len() as i64))
        }
        other => Err(EvalError::MemberNotFound {
            receiver: "Sequence".to_string(),
            member: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_ctor_rejects_arguments() {
        let err = list_ctor(&[Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, EvalError::ArityError { .. }));
    }

    #[test]
    fn sequence_add_and_size() {
        let seq = match Value::new_sequence() {
            Value::Sequence(s) => s,
            _ => unreachable!(),
        };
        call_sequence_method(&seq, "add", &[Value::Integer(1)]).unwrap();
        call_sequence_method(&seq, "push_back", &[Value::Integer(2)]).unwrap();
        let size = call_sequence_method(&seq, "size", &[]).unwrap();
        assert_eq!(size, Value::Integer(2));
    }

    #[test]
    fn unknown_sequence_method_errors() {
        let seq = match Value::new_sequence() {
            Value::Sequence(s) => s,
            _ => unreachable!(),
        };
        let err = call_sequence_method(&seq, "pop", &[]).unwrap_err();
        assert!(matches!(err, EvalError::MemberNotFound { .. }));
    }

    #[test]
    fn resolve_dotted_only_knows_console() {
        assert!(resolve_dotted("Console.WriteLine").is_some());
        assert!(resolve_dotted("Console.Bogus").is_none());
        assert!(resolve_dotted("Other.Thing").is_none());
    }
}
