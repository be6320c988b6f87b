use tw_value::ExecPtr;
use tw_bytecode::ProgramError;

/// Context-free interpreter errors: what went wrong, with no notion of where in the program it
/// happened. Operations return these; the boundary (`step`, `run_to_pause`) adds location
/// context when wrapping them into an [`ExecutionError`] — the same two-tier pattern
/// `miden-processor` uses to separate "what" from "where" (its own `OperationError`/
/// `ExecutionError` split), minus the source-span diagnostics layer, which belongs to the
/// excluded front-end.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of bounds for {kind} of length {len}")]
    IndexOutOfBounds { kind: &'static str, index: i64, len: usize },
    #[error("no attribute '{0}'")]
    NoSuchAttribute(String),
    #[error("no method '{method}' on {kind}")]
    NoSuchMethod { kind: &'static str, method: String },
    #[error("wrong argument count calling '{callee}': expected {expected}, got {got}")]
    ArityMismatch { callee: String, expected: usize, got: usize },
    #[error("missing required argument '{0}'")]
    MissingArgument(String),
    #[error("unknown keyword argument '{0}'")]
    UnknownKeywordArgument(String),
    #[error("'{0}' is not callable")]
    NotCallable(String),
    #[error("unknown builtin '{0}'")]
    UnknownBuiltin(String),
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("call stack depth exceeded the configured limit of {0}")]
    CallDepthExceeded(usize),
    #[error("exceeded the maximum number of steps ({0}) within one atomic step")]
    StepLimitExceeded(u32),
    #[error("a property or entry expression returned no value")]
    NoValueProduced,
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// A user-facing execution error: an [`OperationError`] together with the instruction pointer
/// (and source line, when the program carries a line map) where it occurred.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{source} (at {pc}{line})", line = self.line_suffix())]
pub struct ExecutionError {
    pub pc: ExecPtr,
    pub line: Option<u32>,
    #[source]
    pub source: OperationError,
}

impl ExecutionError {
    pub fn new(pc: ExecPtr, line: Option<u32>, source: OperationError) -> Self {
        Self { pc, line, source }
    }

    fn line_suffix(&self) -> String {
        match self.line {
            Some(line) => format!(", line {line}"),
            None => String::new(),
        }
    }
}
