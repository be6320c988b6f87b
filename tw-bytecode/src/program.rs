use std::collections::BTreeMap;

use tw_value::{ExecPtr, Value, MAIN_BLOCK};

use crate::op::Op;

/// A linear sequence of instructions plus the source line each came from.
///
/// `line_map[i]` is the source line for `ops[i]`; the two vectors are always the same length.
/// An [`ExecPtr`]'s offset indexes directly into `ops` — there is no byte-level encoding to
/// speak of once the opcode stream lives as a typed `Vec<Op>` rather than raw bytes.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub ops: Vec<Op>,
    pub line_map: Vec<u32>,
}

impl Block {
    pub fn new(ops: Vec<Op>, line_map: Vec<u32>) -> Self {
        debug_assert_eq!(ops.len(), line_map.len(), "line_map must track ops 1:1");
        Self { ops, line_map }
    }

    pub fn op_at(&self, offset: u32) -> Option<&Op> {
        self.ops.get(offset as usize)
    }

    pub fn line_at(&self, offset: u32) -> Option<u32> {
        self.line_map.get(offset as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// One formal parameter of a function block: a name and an optional default value, bound when a
/// call supplies no corresponding argument thunk.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
}

/// A function definition: its parameters and its body block.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionBlock {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("block {0} does not exist (program has {1} function blocks)")]
    BlockNotFound(u32, usize),
    #[error("export '{0}' is not defined in this program")]
    ExportNotFound(String),
}

/// An immutable, compiled program: one main block plus `N` function blocks, reachable either by
/// block id (an [`ExecPtr`] embeds one) or by exported name (entry-point seeding resolves
/// configured entry expressions to these).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Program {
    pub main: Block,
    pub functions: Vec<FunctionBlock>,
    /// Exported function name -> block id (always >= 1; block id 0 is `main` and is never
    /// exported under a name of its own).
    pub exports: BTreeMap<String, u32>,
}

impl Program {
    /// Looks up the block addressed by `block_id` (0 = main).
    pub fn block(&self, block_id: u32) -> Result<&Block, ProgramError> {
        if block_id == MAIN_BLOCK {
            return Ok(&self.main);
        }
        self.functions
            .get((block_id - 1) as usize)
            .map(|f| &f.block)
            .ok_or(ProgramError::BlockNotFound(block_id, self.functions.len()))
    }

    /// Looks up the function definition addressed by `block_id` (never `0`: the main block has
    /// no parameter list).
    pub fn function(&self, block_id: u32) -> Result<&FunctionBlock, ProgramError> {
        if block_id == MAIN_BLOCK {
            return Err(ProgramError::BlockNotFound(block_id, self.functions.len()));
        }
        self.functions
            .get((block_id - 1) as usize)
            .ok_or(ProgramError::BlockNotFound(block_id, self.functions.len()))
    }

    /// Resolves an exported function name to the entry pointer of its block.
    pub fn resolve_export(&self, name: &str) -> Result<ExecPtr, ProgramError> {
        self.exports
            .get(name)
            .map(|&id| ExecPtr::entry(id))
            .ok_or_else(|| ProgramError::ExportNotFound(name.to_owned()))
    }

    /// Source line for the instruction a pointer addresses, if any.
    pub fn line_of(&self, ptr: ExecPtr) -> Option<u32> {
        self.block(ptr.block_id()).ok().and_then(|b| b.line_at(ptr.offset()))
    }

    /// The opcode a pointer addresses.
    pub fn op_at(&self, ptr: ExecPtr) -> Result<&Op, ProgramError> {
        let block = self.block(ptr.block_id())?;
        block
            .op_at(ptr.offset())
            .ok_or(ProgramError::BlockNotFound(ptr.block_id(), self.functions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Program {
        let main = Block::new(vec![Op::Nop, Op::Return], vec![1, 1]);
        let mut exports = BTreeMap::new();
        exports.insert("step".to_owned(), 1);
        Program {
            main,
            functions: vec![FunctionBlock {
                name: "step".to_owned(),
                params: vec![ParamSpec { name: "n".to_owned(), default: None }],
                block: Block::new(vec![Op::Return], vec![2]),
            }],
            exports,
        }
    }

    #[test]
    fn resolves_exports_to_function_blocks() {
        let program = sample_program();
        let ptr = program.resolve_export("step").unwrap();
        assert_eq!(ptr.block_id(), 1);
        assert!(matches!(program.op_at(ptr).unwrap(), Op::Return));
    }

    #[test]
    fn unknown_export_is_an_error() {
        let program = sample_program();
        assert_eq!(
            program.resolve_export("missing").unwrap_err(),
            ProgramError::ExportNotFound("missing".to_owned())
        );
    }

    #[test]
    fn main_block_has_no_parameters() {
        let program = sample_program();
        assert_eq!(program.function(MAIN_BLOCK).unwrap_err(), ProgramError::BlockNotFound(0, 1));
    }
}
