//! Tagged-union runtime value model for Timewinder's interpreter, CAS, and explorer.
//!
//! This crate has no knowledge of bytecode, the interpreter loop, or the state explorer; it
//! exists so those layers share one definition of "a value the modelled language can produce".

mod exec_ptr;
mod value;

pub use exec_ptr::{ExecPtr, MAIN_BLOCK};
pub use value::{Value, ValueError};
