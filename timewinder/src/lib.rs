//! Timewinder: a verification engine that exhaustively explores every thread interleaving of a
//! small concurrent program's bytecode, checking safety and liveness properties against the
//! resulting state graph (§1).
//!
//! This crate is the facade: it defines the plain-struct configuration shapes a front-end/config
//! loader hands the core (§6) and the one entry point, [`harness::run`], that seeds the initial
//! state from them and drives [`tw_explore::explore`]. Parsing source text, compiling expressions
//! to bytecode, and rendering a [`tw_explore::RunReport`] for a terminal are all out of scope here
//! (§1 "Deliberately out of scope") — this crate only wires together inputs a front-end has
//! already compiled.

pub mod config;
pub mod harness;

pub use config::{Flags, PropertyConfig, RunConfig, ThreadConfig};
pub use harness::run;

pub use tw_bytecode::{Block, FunctionBlock, ParamSpec, Program, ProgramError};
pub use tw_explore::{Operator, Property, RunReport, Stats, Violation, ViolationKind};
