use std::collections::HashMap;
use std::sync::Arc;

use tw_value::Value;

use crate::errors::OperationError;

/// A builtin is a free function, resolved by name and invoked synchronously with its already-
/// evaluated, already-bound positional arguments.
///
/// Builtins that model nondeterministic choice return `Value::NonDet(..)`; the interpreter
/// recognizes that shape on the return path and turns it into a yield rather than pushing it
/// (§4.1) — a builtin never needs to know it is being model-checked.
pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Result<Value, OperationError> + Send + Sync>;

/// The read-only table of builtins available to a program, shared across every thread.
///
/// Built once per [`Program`](tw_bytecode::Program) and held behind an `Arc`, mirroring how the
/// teacher's opcode dispatch tables are fixed, shared, read-only structures (§4.1 supplement:
/// the registry's concrete shape is left open by the source spec, which only describes its
/// effect).
#[derive(Clone)]
pub struct Registry {
    builtins: HashMap<&'static str, BuiltinFn>,
}

impl Registry {
    pub fn empty() -> Self {
        Self { builtins: HashMap::new() }
    }

    /// The minimal standard set inferred from §8's end-to-end scenarios: `len` (used by the
    /// bounded-buffer scenario's `len(buf)`) and `nondet` (the mechanism every nondeterministic
    /// choice in a modelled program goes through).
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("len", |args| match args {
            [Value::Array(a)] => Ok(Value::Int(a.len() as i64)),
            [Value::Map(m)] => Ok(Value::Int(m.len() as i64)),
            [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [other] => Err(OperationError::TypeError(format!("len() has no meaning for {}", other.type_name()))),
            _ => Err(OperationError::ArityMismatch { callee: "len".into(), expected: 1, got: args.len() }),
        });
        registry.register("nondet", |args| match args {
            [Value::Array(choices)] => Ok(Value::NonDet(choices.clone())),
            [other] => Err(OperationError::TypeError(format!(
                "nondet() expects a list of choices, got {}",
                other.type_name()
            ))),
            _ => Err(OperationError::ArityMismatch { callee: "nondet".into(), expected: 1, got: args.len() }),
        });
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        f: impl Fn(&[Value]) -> Result<Value, OperationError> + Send + Sync + 'static,
    ) {
        self.builtins.insert(name, Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.builtins.get(name)
    }

    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, OperationError> {
        self.get(name).ok_or_else(|| OperationError::UnknownBuiltin(name.to_owned()))?(args)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_counts_array_elements() {
        let registry = Registry::standard();
        let result = registry.invoke("len", &[Value::Array(vec![Value::Int(1), Value::Int(2)])]).unwrap();
        assert_eq!(result, Value::Int(2));
    }

    #[test]
    fn nondet_wraps_a_choice_list() {
        let registry = Registry::standard();
        let choices = vec![Value::Int(1), Value::Int(2)];
        let result = registry.invoke("nondet", &[Value::Array(choices.clone())]).unwrap();
        assert_eq!(result, Value::NonDet(choices));
    }

    #[test]
    fn nondet_of_empty_list_is_the_distinguished_no_choice_value() {
        let registry = Registry::standard();
        let result = registry.invoke("nondet", &[Value::Array(vec![])]).unwrap();
        assert_eq!(result, Value::NonDet(vec![]));
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let registry = Registry::standard();
        assert!(registry.invoke("frobnicate", &[]).is_err());
    }
}
