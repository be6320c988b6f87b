use tw_value::Value;

/// Which of a slice expression's three bounds (`start:end:step`) were actually written by the
/// source, as opposed to left to their defaults (`a[:]`, `a[1:]`, ...).
///
/// Carried as the `SLICE` opcode's compile-time argument rather than as extra stack operands:
/// the interpreter pops exactly as many values as are present here, in `start, end, step` order,
/// and fills the rest in with the slice's natural defaults (`0`, length, `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct SliceMask {
    pub start: bool,
    pub end: bool,
    pub step: bool,
}

/// A single bytecode instruction.
///
/// This is the closed opcode set of a small stack-oriented ISA, with every
/// compile-time operand (variable names, jump targets, argument counts) folded directly into the
/// variant rather than looked up through a side table, so a `Block` is just `Vec<Op>`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Op {
    Nop,
    Push(Value),
    Pop,
    Dup,
    Swap,

    SetVar(String),
    GetVar(String),
    GetAttr(String),
    SetAttr(String),
    Slice(SliceMask),

    Add,
    Sub,
    Mul,
    Div,

    Eq,
    Lt,
    Le,
    Not,

    BuildList(u32),
    /// `n` key/value pairs; the stack holds `2n` values, flattened `[key, value, key, value, ...]`.
    BuildDict(u32),
    /// Wraps the top-of-stack value as an argument thunk. `Some(name)` for a keyword argument,
    /// `None` for a positional one.
    BuildArg(Option<String>),

    /// Absolute byte offset within the current block.
    Jmp(u32),
    /// Pops a boolean; jumps to the given offset if it is false.
    JFalse(u32),
    Return,

    Call(u32),
    CallMethod(u32),

    /// Pops an iterable; binds `var` to each element in turn, jumping to `end` when exhausted.
    IterStart { end: u32, var: String },
    /// Two-variable form: `(index, value)` over a sequence, `(key, value)` over a map.
    IterStart2 { end: u32, var1: String, var2: String },
    IterNext,
    IterEnd,

    Yield,
    FairYield,
    StrongYield,
    /// Pops a boolean. If true, yields runnable; if false, yields `Waiting` with `retry` as the
    /// wait descriptor's condition PC.
    ConditionalYield(u32),
    ConditionalFairYield(u32),
}

impl Op {
    /// Whether this opcode ends the interpreter's current atomic step (`run-to-pause` stops here).
    pub const fn is_yield(&self) -> bool {
        matches!(
            self,
            Op::Yield
                | Op::FairYield
                | Op::StrongYield
                | Op::ConditionalYield(_)
                | Op::ConditionalFairYield(_)
        )
    }
}
