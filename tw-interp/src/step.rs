use std::cmp::Ordering;
use std::collections::BTreeMap;

use tw_bytecode::{Op, SliceMask};
use tw_bytecode::Program;
use tw_value::{ExecPtr, Value};

use crate::builtins::Registry;
use crate::errors::{ExecutionError, OperationError};
use crate::frame::{Frame, IterCursor, IterState, IterVars, WaitDescriptor, FairnessTag};
use crate::globals::Globals;
use crate::options::ExecutionOptions;
use crate::thread::{PauseReason, Thread};

/// What one call to [`step`] produced. `step` always executes exactly one opcode; the caller
/// (`run_to_pause`) decides what to do with the result and whether to keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Ordinary progress: one opcode executed, the frame's program counter moved on.
    Continue,
    /// The current frame returned; the boxed value is what it returned.
    Return(Value),
    /// A call needs a new frame pushed on top of the caller's.
    Call { frame: Box<Frame> },
    /// Execution reached a yield point; the thread stops running until the host resumes it.
    Yield { reason: YieldKind },
}

/// The reason execution paused at a yield opcode, carrying whatever the explorer needs to decide
/// what happens next (a wait condition to re-evaluate, a choice set to branch on).
#[derive(Debug, Clone, PartialEq)]
pub enum YieldKind {
    Runnable,
    /// FAIR_YIELD (§4.1): runnable, and marks the yielding thread weakly fair for the rest of
    /// the run ("Fairness flags on the thread are set accordingly") — distinct from
    /// `WeaklyFairWaiting`, which carries the same obligation for a conditional yield whose
    /// guard is currently false.
    WeaklyFairRunnable,
    /// STRONG_YIELD (§4.1): runnable, and marks the yielding thread strongly fair for the rest
    /// of the run.
    StronglyFairRunnable,
    Waiting(WaitDescriptor),
    WeaklyFairWaiting(WaitDescriptor),
    NonDet(Vec<Value>),
}

impl YieldKind {
    pub fn pause_reason(&self) -> PauseReason {
        match self {
            YieldKind::Runnable | YieldKind::WeaklyFairRunnable | YieldKind::StronglyFairRunnable => {
                PauseReason::Runnable
            },
            YieldKind::Waiting(_) => PauseReason::Waiting,
            YieldKind::WeaklyFairWaiting(_) => PauseReason::WeaklyFairWaiting,
            YieldKind::NonDet(_) => PauseReason::NonDet,
        }
    }

    pub fn wait_descriptor(&self) -> Option<WaitDescriptor> {
        match self {
            YieldKind::Waiting(w) | YieldKind::WeaklyFairWaiting(w) => Some(*w),
            _ => None,
        }
    }

    /// Whether this yield sets a persistent weak-fairness obligation on the thread itself,
    /// as opposed to the per-wait fairness tag carried by `WeaklyFairWaiting` (§4.1 FAIR_YIELD).
    pub fn marks_weakly_fair(&self) -> bool {
        matches!(self, YieldKind::WeaklyFairRunnable)
    }

    /// Whether this yield sets a persistent strong-fairness obligation on the thread itself
    /// (§4.1 STRONG_YIELD).
    pub fn marks_strongly_fair(&self) -> bool {
        matches!(self, YieldKind::StronglyFairRunnable)
    }
}

fn op_error_at(pc: ExecPtr, line: Option<u32>, source: OperationError) -> ExecutionError {
    ExecutionError::new(pc, line, source)
}

fn pop(frame: &mut Frame) -> Result<Value, OperationError> {
    frame.pop().ok_or(OperationError::StackUnderflow)
}

fn pop_int(frame: &mut Frame) -> Result<i64, OperationError> {
    match pop(frame)? {
        Value::Int(i) => Ok(i),
        other => Err(OperationError::TypeError(format!("expected int, got {}", other.type_name()))),
    }
}

fn pop_bool(frame: &mut Frame) -> Result<bool, OperationError> {
    match pop(frame)? {
        Value::Bool(b) => Ok(b),
        other => Err(OperationError::TypeError(format!("expected bool, got {}", other.type_name()))),
    }
}

fn pop_str(frame: &mut Frame) -> Result<String, OperationError> {
    match pop(frame)? {
        Value::Str(s) => Ok(s),
        other => Err(OperationError::TypeError(format!("expected str, got {}", other.type_name()))),
    }
}

fn resolve_get(
    program: &Program,
    registry: &Registry,
    globals: &Globals,
    frame: &Frame,
    name: &str,
) -> Result<Value, OperationError> {
    if let Some(v) = frame.vars.get(name) {
        return Ok(v.clone());
    }
    if let Some(v) = globals.get(name) {
        return Ok(v.clone());
    }
    if let Ok(ptr) = program.resolve_export(name) {
        return Ok(Value::Func(ptr));
    }
    if registry.get(name).is_some() {
        return Ok(Value::Builtin(name.to_owned()));
    }
    Err(OperationError::UnboundVariable(name.to_owned()))
}

/// Assignment is local-by-default: it updates an existing binding wherever it is found (the
/// current frame, then globals), and only creates a fresh binding in the current frame when the
/// name is unbound anywhere.
fn assign(globals: &mut Globals, frame: &mut Frame, name: String, value: Value) {
    if frame.vars.contains_key(&name) {
        frame.vars.insert(name, value);
    } else if globals.contains(&name) {
        globals.set(name, value);
    } else {
        frame.vars.insert(name, value);
    }
}

fn as_map(v: Value) -> Result<BTreeMap<String, Value>, OperationError> {
    match v {
        Value::Map(m) => Ok(m),
        other => Err(OperationError::TypeError(format!("expected map, got {}", other.type_name()))),
    }
}

fn slice_bounds(mask: SliceMask, len: usize, frame: &mut Frame) -> Result<(usize, usize, i64), OperationError> {
    // Pushed in `start, end, step` order, so popped in the reverse order below.
    let step = if mask.step { pop_int(frame)? } else { 1 };
    let end = if mask.end { pop_int(frame)? } else { len as i64 };
    let start = if mask.start { pop_int(frame)? } else { 0 };
    if step == 0 {
        return Err(OperationError::TypeError("slice step cannot be zero".into()));
    }
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { i + len as i64 } else { i };
        i.clamp(0, len as i64) as usize
    };
    Ok((clamp(start), clamp(end), step))
}

/// Executes exactly one opcode from `frame`, leaving it positioned for the next call unless the
/// outcome says otherwise (a `Call` leaves the caller frame's program counter already advanced
/// past the `CALL`/`CALL_METHOD` instruction, ready to receive the callee's return value).
pub fn step(
    program: &Program,
    registry: &Registry,
    globals: &mut Globals,
    frame: &mut Frame,
) -> Result<StepOutcome, ExecutionError> {
    let pc = frame.pc;
    let line = program.line_of(pc);
    let op = program.op_at(pc).map_err(|e| op_error_at(pc, line, OperationError::from(e)))?.clone();

    macro_rules! fail {
        ($err:expr) => {
            return Err(op_error_at(pc, line, $err))
        };
    }
    macro_rules! try_op {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(e) => fail!(e),
            }
        };
    }

    match op {
        Op::Nop => {},
        Op::Push(v) => frame.push(v),
        Op::Pop => {
            try_op!(pop(frame));
        },
        Op::Dup => {
            let v = try_op!(pop(frame));
            frame.push(v.clone());
            frame.push(v);
        },
        Op::Swap => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            frame.push(b);
            frame.push(a);
        },

        Op::SetVar(name) => {
            let v = try_op!(pop(frame));
            assign(globals, frame, name, v);
        },
        Op::GetVar(name) => {
            let v = try_op!(resolve_get(program, registry, globals, frame, &name));
            frame.push(v);
        },
        Op::GetAttr(name) => {
            let obj = try_op!(pop(frame));
            let map = try_op!(as_map(obj));
            let v = try_op!(map.get(&name).cloned().ok_or_else(|| OperationError::NoSuchAttribute(name.clone())));
            frame.push(v);
        },
        Op::SetAttr(name) => {
            let value = try_op!(pop(frame));
            let obj = try_op!(pop(frame));
            let mut map = try_op!(as_map(obj));
            map.insert(name, value);
            frame.push(Value::Map(map));
        },
        Op::Slice(mask) => {
            let obj = try_op!(pop(frame));
            match obj {
                Value::Array(items) => {
                    let (start, end, step) = try_op!(slice_bounds(mask, items.len(), frame));
                    frame.push(Value::Array(sliced(items, start, end, step)));
                },
                Value::Str(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let (start, end, step) = try_op!(slice_bounds(mask, chars.len(), frame));
                    let out: String = sliced(chars, start, end, step).into_iter().collect();
                    frame.push(Value::Str(out));
                },
                other => fail!(OperationError::TypeError(format!("cannot slice {}", other.type_name()))),
            }
        },

        Op::Add => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            let v = try_op!(a.add(&b).map_err(value_error));
            frame.push(v);
        },
        Op::Sub => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            frame.push(try_op!(numeric(a, b, |x, y| x.wrapping_sub(y), |x, y| x - y)));
        },
        Op::Mul => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            frame.push(try_op!(numeric(a, b, |x, y| x.wrapping_mul(y), |x, y| x * y)));
        },
        Op::Div => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            frame.push(try_op!(divide(a, b)));
        },

        Op::Eq => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            frame.push(Value::Bool(a == b));
        },
        Op::Lt => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            let ord = try_op!(a.compare(&b).map_err(value_error));
            frame.push(Value::Bool(ord == Ordering::Less));
        },
        Op::Le => {
            let b = try_op!(pop(frame));
            let a = try_op!(pop(frame));
            let ord = try_op!(a.compare(&b).map_err(value_error));
            frame.push(Value::Bool(ord != Ordering::Greater));
        },
        Op::Not => {
            let a = try_op!(pop(frame));
            frame.push(Value::Bool(!a.is_truthy()));
        },

        Op::BuildList(n) => {
            let mut items = Vec::with_capacity(n as usize);
            for _ in 0..n {
                items.push(try_op!(pop(frame)));
            }
            items.reverse();
            frame.push(Value::Array(items));
        },
        Op::BuildDict(n) => {
            let mut pairs = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let value = try_op!(pop(frame));
                let key = try_op!(pop_str(frame));
                pairs.push((key, value));
            }
            pairs.reverse();
            frame.push(Value::Map(pairs.into_iter().collect()));
        },
        Op::BuildArg(key) => {
            let value = try_op!(pop(frame));
            frame.push(Value::Arg { key, value: Box::new(value) });
        },

        Op::Jmp(offset) => {
            frame.pc = pc.with_offset(offset);
            return Ok(StepOutcome::Continue);
        },
        Op::JFalse(offset) => {
            let cond = try_op!(pop_bool(frame));
            frame.pc = if cond { pc.advance(1) } else { pc.with_offset(offset) };
            return Ok(StepOutcome::Continue);
        },
        Op::Return => {
            let v = try_op!(pop(frame).map_err(|_| OperationError::NoValueProduced));
            return Ok(StepOutcome::Return(v));
        },

        Op::Call(argc) => {
            let args = try_op!(pop_args(frame, argc));
            let callee = try_op!(pop(frame));
            frame.pc = pc.advance(1);
            match callee {
                Value::Func(ptr) => {
                    let func = try_op!(program.function(ptr.block_id()).map_err(OperationError::from));
                    let vars = try_op!(bind_params(&func.name, &func.params, args));
                    return Ok(StepOutcome::Call { frame: Box::new(Frame { pc: ptr, vars, ..Default::default() }) });
                },
                Value::Builtin(name) => {
                    let positional = try_op!(positional_only(&name, args));
                    let result = try_op!(registry.invoke(&name, &positional));
                    if let Value::NonDet(choices) = result {
                        return Ok(StepOutcome::Yield { reason: YieldKind::NonDet(choices) });
                    }
                    frame.push(result);
                },
                other => fail!(OperationError::NotCallable(format!("{other}"))),
            }
            return Ok(StepOutcome::Continue);
        },
        Op::CallMethod(argc) => {
            let args = try_op!(pop_args(frame, argc));
            let method = try_op!(pop_str(frame));
            let receiver = try_op!(pop(frame));
            let result = try_op!(call_method(receiver, &method, args));
            frame.push(result);
        },

        Op::IterStart { end, var } => {
            let iterable = try_op!(pop(frame));
            let cursor = try_op!(make_cursor(iterable));
            if cursor.is_empty() {
                frame.pc = pc.with_offset(end);
                return Ok(StepOutcome::Continue);
            }
            bind_iter_vars(frame, &IterVars::One(var.clone()), &cursor);
            frame.iterators.push(IterState {
                resume: pc.advance(1),
                exit: pc.with_offset(end),
                vars: IterVars::One(var),
                cursor,
            });
        },
        Op::IterStart2 { end, var1, var2 } => {
            let iterable = try_op!(pop(frame));
            let cursor = try_op!(make_cursor(iterable));
            if cursor.is_empty() {
                frame.pc = pc.with_offset(end);
                return Ok(StepOutcome::Continue);
            }
            bind_iter_vars(frame, &IterVars::Two(var1.clone(), var2.clone()), &cursor);
            frame.iterators.push(IterState {
                resume: pc.advance(1),
                exit: pc.with_offset(end),
                vars: IterVars::Two(var1, var2),
                cursor,
            });
        },
        Op::IterNext => {
            let exhausted = {
                let state = try_op!(frame.iterators.last_mut().ok_or(OperationError::StackUnderflow));
                state.cursor.advance();
                state.cursor.is_exhausted()
            };
            if exhausted {
                let state = frame.iterators.pop().expect("checked Some above");
                frame.pc = state.exit;
                return Ok(StepOutcome::Continue);
            }
            let (resume, vars, cursor) = {
                let state = frame.iterators.last().expect("checked Some above");
                (state.resume, state.vars.clone(), state.cursor.clone())
            };
            bind_iter_vars(frame, &vars, &cursor);
            frame.pc = resume;
            return Ok(StepOutcome::Continue);
        },
        Op::IterEnd => {
            try_op!(frame.iterators.pop().ok_or(OperationError::StackUnderflow));
        },

        Op::Yield => {
            debug_assert!(frame.stack_is_empty_at_yield());
            frame.pc = pc.advance(1);
            return Ok(StepOutcome::Yield { reason: YieldKind::Runnable });
        },
        Op::FairYield => {
            debug_assert!(frame.stack_is_empty_at_yield());
            frame.pc = pc.advance(1);
            return Ok(StepOutcome::Yield { reason: YieldKind::WeaklyFairRunnable });
        },
        Op::StrongYield => {
            debug_assert!(frame.stack_is_empty_at_yield());
            frame.pc = pc.advance(1);
            return Ok(StepOutcome::Yield { reason: YieldKind::StronglyFairRunnable });
        },
        Op::ConditionalYield(retry) => {
            let cond = try_op!(pop_bool(frame));
            frame.pc = pc.advance(1);
            if cond {
                return Ok(StepOutcome::Yield { reason: YieldKind::Runnable });
            }
            let wait = WaitDescriptor { condition_pc: pc.with_offset(retry), fairness: FairnessTag::None };
            frame.wait = Some(wait);
            return Ok(StepOutcome::Yield { reason: YieldKind::Waiting(wait) });
        },
        Op::ConditionalFairYield(retry) => {
            let cond = try_op!(pop_bool(frame));
            frame.pc = pc.advance(1);
            if cond {
                return Ok(StepOutcome::Yield { reason: YieldKind::Runnable });
            }
            let wait = WaitDescriptor { condition_pc: pc.with_offset(retry), fairness: FairnessTag::Weak };
            frame.wait = Some(wait);
            return Ok(StepOutcome::Yield { reason: YieldKind::WeaklyFairWaiting(wait) });
        },
    }

    frame.pc = pc.advance(1);
    Ok(StepOutcome::Continue)
}

fn value_error(e: tw_value::ValueError) -> OperationError {
    match e {
        tw_value::ValueError::Incomparable { lhs, rhs } => {
            OperationError::TypeError(format!("incompatible operand kinds: {lhs} and {rhs}"))
        },
    }
}

fn numeric(a: Value, b: Value, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<Value, OperationError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(a, b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(a, b))),
        (a, b) => Err(OperationError::TypeError(format!(
            "arithmetic not defined for {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn divide(a: Value, b: Value) -> Result<Value, OperationError> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(OperationError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
        (a, b) => Err(OperationError::TypeError(format!(
            "arithmetic not defined for {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn sliced<T: Clone>(items: Vec<T>, start: usize, end: usize, step: i64) -> Vec<T> {
    if step > 0 {
        let step = step as usize;
        if start >= end {
            return Vec::new();
        }
        items[start..end].iter().step_by(step).cloned().collect()
    } else {
        let step = (-step) as usize;
        let mut out = Vec::new();
        let mut i = end;
        while i > start {
            i -= 1;
            if (end - 1 - i) % step == 0 {
                out.push(items[i].clone());
            }
        }
        out
    }
}

/// Pops `argc` argument thunks (built by `BUILD_ARG`) and restores source order.
fn pop_args(frame: &mut Frame, argc: u32) -> Result<Vec<(Option<String>, Value)>, OperationError> {
    let mut args = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        match pop(frame)? {
            Value::Arg { key, value } => args.push((key, *value)),
            other => return Err(OperationError::TypeError(format!("expected an argument thunk, got {other}"))),
        }
    }
    args.reverse();
    Ok(args)
}

fn positional_only(callee: &str, args: Vec<(Option<String>, Value)>) -> Result<Vec<Value>, OperationError> {
    args.into_iter()
        .map(|(key, value)| match key {
            None => Ok(value),
            Some(k) => Err(OperationError::UnknownKeywordArgument(format!("{k} (calling builtin '{callee}')"))),
        })
        .collect()
}

/// Binds positional arguments first (in call order), then keyword arguments by name, then fills
/// any remaining parameters from their defaults.
fn bind_params(
    callee: &str,
    params: &[tw_bytecode::ParamSpec],
    args: Vec<(Option<String>, Value)>,
) -> Result<BTreeMap<String, Value>, OperationError> {
    let mut bound: BTreeMap<String, Value> = BTreeMap::new();
    let mut positionals = args.iter().filter(|(k, _)| k.is_none());
    for param in params {
        if let Some((_, value)) = positionals.next() {
            bound.insert(param.name.clone(), value.clone());
        }
    }
    let positional_count = args.iter().filter(|(k, _)| k.is_none()).count();
    if positional_count > params.len() {
        return Err(OperationError::ArityMismatch {
            callee: callee.to_owned(),
            expected: params.len(),
            got: positional_count,
        });
    }
    for (key, value) in args.iter().filter(|(k, _)| k.is_some()) {
        let name = key.clone().expect("filtered on is_some");
        if !params.iter().any(|p| p.name == name) {
            return Err(OperationError::UnknownKeywordArgument(name));
        }
        bound.insert(name, value.clone());
    }
    for param in params {
        if !bound.contains_key(&param.name) {
            match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                },
                None => return Err(OperationError::MissingArgument(param.name.clone())),
            }
        }
    }
    Ok(bound)
}

fn call_method(receiver: Value, method: &str, args: Vec<(Option<String>, Value)>) -> Result<Value, OperationError> {
    let positional = positional_only(method, args)?;
    match (receiver, method) {
        (Value::Array(mut items), "append") => {
            let [value] = take_exactly(positional, "append")?;
            items.push(value);
            Ok(Value::Array(items))
        },
        (Value::Array(mut items), "pop") => {
            if positional.len() > 1 {
                return Err(OperationError::ArityMismatch { callee: "pop".into(), expected: 1, got: positional.len() });
            }
            let index = match positional.into_iter().next() {
                Some(Value::Int(i)) => i,
                Some(other) => return Err(OperationError::TypeError(format!("expected int, got {}", other.type_name()))),
                None => -1,
            };
            let at = normalize_index(index, items.len(), "array")?;
            let popped = items.remove(at);
            Ok(Value::Array(vec![Value::Array(items), popped]))
        },
        (other, method) => Err(OperationError::NoSuchMethod { kind: other.type_name(), method: method.to_owned() }),
    }
}

/// Resolves a possibly-negative index (Python-style, counting from the end) against a length,
/// erroring rather than clamping — unlike `slice_bounds`, an out-of-range single-element access
/// has no sensible in-range fallback.
fn normalize_index(index: i64, len: usize, kind: &'static str) -> Result<usize, OperationError> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(OperationError::IndexOutOfBounds { kind, index, len });
    }
    Ok(resolved as usize)
}

fn take_exactly<const N: usize>(args: Vec<Value>, callee: &str) -> Result<[Value; N], OperationError> {
    let got = args.len();
    args.try_into().map_err(|_| OperationError::ArityMismatch { callee: callee.to_owned(), expected: N, got })
}

fn make_cursor(iterable: Value) -> Result<IterCursor, OperationError> {
    match iterable {
        Value::Array(items) => Ok(IterCursor::over_array(items)),
        Value::Map(map) => Ok(IterCursor::over_map(&map)),
        other => Err(OperationError::TypeError(format!("cannot iterate over {}", other.type_name()))),
    }
}

fn bind_iter_vars(frame: &mut Frame, vars: &IterVars, cursor: &IterCursor) {
    let (first, second) = cursor.current();
    match vars {
        IterVars::One(name) => {
            // Single-variable form binds the value for a sequence, the key for a map.
            let bound = match cursor {
                IterCursor::Seq { .. } => second,
                IterCursor::Map { .. } => first,
            };
            frame.vars.insert(name.clone(), bound);
        },
        IterVars::Two(n1, n2) => {
            frame.vars.insert(n1.clone(), first);
            frame.vars.insert(n2.clone(), second);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(items: Vec<i64>) -> Value {
        Value::Array(items.into_iter().map(Value::Int).collect())
    }

    #[test]
    fn append_returns_the_grown_array() {
        let result = call_method(arr(vec![1, 2]), "append", vec![(None, Value::Int(3))]).unwrap();
        assert_eq!(result, arr(vec![1, 2, 3]));
    }

    #[test]
    fn pop_with_no_argument_removes_the_last_element() {
        let result = call_method(arr(vec![1, 2, 3]), "pop", vec![]).unwrap();
        assert_eq!(result, Value::Array(vec![arr(vec![1, 2]), Value::Int(3)]));
    }

    #[test]
    fn pop_with_an_index_removes_that_element() {
        let result = call_method(arr(vec![1, 2, 3]), "pop", vec![(None, Value::Int(0))]).unwrap();
        assert_eq!(result, Value::Array(vec![arr(vec![2, 3]), Value::Int(1)]));
    }

    #[test]
    fn pop_with_a_negative_index_counts_from_the_end() {
        let result = call_method(arr(vec![1, 2, 3]), "pop", vec![(None, Value::Int(-2))]).unwrap();
        assert_eq!(result, Value::Array(vec![arr(vec![1, 3]), Value::Int(2)]));
    }

    #[test]
    fn pop_out_of_range_is_an_error() {
        let err = call_method(arr(vec![1]), "pop", vec![(None, Value::Int(5))]).unwrap_err();
        assert!(matches!(err, OperationError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn pop_on_an_empty_array_is_an_error() {
        let err = call_method(arr(vec![]), "pop", vec![]).unwrap_err();
        assert!(matches!(err, OperationError::IndexOutOfBounds { .. }));
    }
}
