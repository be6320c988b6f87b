use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::ExecPtr;

/// A value producible by the interpreter.
///
/// `Value` is a tagged sum: every variant is deep-clonable, every variant has a truthiness
/// reading, and ordering is defined only *within* a kind — comparing values of different kinds is
/// a [`ValueError::Incomparable`], not a panic, mirroring the interpreter's own "type errors fail
/// the run, they are not explored alternatives" rule (they are raised the same way any other
/// opcode-level error is).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A function pointer, produced by resolving an exported name or passed as a callback value.
    Func(ExecPtr),
    /// A builtin, resolved by name against the interpreter's builtin registry at call time.
    Builtin(String),
    /// An argument thunk assembled by `BUILD_ARG`, consumed by `CALL`/`CALL_METHOD`.
    Arg {
        key: Option<String>,
        value: Box<Value>,
    },
    /// A nondeterministic choice set: a finite list of alternative values, one of which the
    /// canonicaliser will split the enclosing state on.
    NonDet(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("cannot compare {lhs} to {rhs}")]
    Incomparable { lhs: &'static str, rhs: &'static str },
}

impl Value {
    /// Human-readable type name, used in error messages and as part of the CAS type tag for
    /// leaf values.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Func(_) => "func",
            Value::Builtin(_) => "builtin",
            Value::Arg { .. } => "arg",
            Value::NonDet(_) => "nondet",
        }
    }

    /// Python-like truthiness: `false`, `0`, `0.0`, `""`, `[]` and `{}` are falsy; everything
    /// else (including function pointers and builtins) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Func(_) | Value::Builtin(_) => true,
            Value::Arg { value, .. } => value.is_truthy(),
            Value::NonDet(choices) => !choices.is_empty(),
        }
    }

    /// Total ordering within a kind; `Err` if `self` and `other` are different kinds (or are a
    /// kind ordering is never defined for, such as maps).
    pub fn compare(&self, other: &Value) -> Result<Ordering, ValueError> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).ok_or(ValueError::Incomparable {
                    lhs: "float (NaN)",
                    rhs: "float (NaN)",
                })
            },
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            },
            _ => Err(ValueError::Incomparable { lhs: self.type_name(), rhs: other.type_name() }),
        }
    }

    /// Arithmetic addition; strings concatenate and arrays extend rather than erroring.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::Array(out))
            },
            _ => Err(ValueError::Incomparable { lhs: self.type_name(), rhs: other.type_name() }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            },
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            },
            Value::Func(ptr) => write!(f, "<func {ptr}>"),
            Value::Builtin(name) => write!(f, "<builtin {name}>"),
            Value::Arg { key, value } => match key {
                Some(k) => write!(f, "{k}={value}"),
                None => write!(f, "{value}"),
            },
            Value::NonDet(choices) => write!(f, "<nondet {} choices>", choices.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::Bool(false), false)]
    #[case(Value::Int(0), false)]
    #[case(Value::Int(1), true)]
    #[case(Value::Str(String::new()), false)]
    #[case(Value::Array(vec![]), false)]
    #[case(Value::Array(vec![Value::Int(0)]), true)]
    #[case(Value::Map(BTreeMap::new()), false)]
    fn truthiness(#[case] v: Value, #[case] expected: bool) {
        assert_eq!(v.is_truthy(), expected);
    }

    #[test]
    fn cross_kind_comparison_fails() {
        let err = Value::Int(1).compare(&Value::Str("1".into())).unwrap_err();
        assert_eq!(err, ValueError::Incomparable { lhs: "int", rhs: "str" });
    }

    #[test]
    fn string_addition_concatenates() {
        let a = Value::Str("foo".into());
        let b = Value::Str("bar".into());
        assert_eq!(a.add(&b).unwrap(), Value::Str("foobar".into()));
    }

    #[test]
    fn array_comparison_is_lexicographic() {
        let a = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Array(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }
}
