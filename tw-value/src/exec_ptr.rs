use core::fmt;

/// An instruction address: a block id in the upper 32 bits, a byte offset in the lower 32.
///
/// Block id `0` denotes the program's main block; positive ids index function blocks in
/// declaration order. Packing both halves into a single `u64` keeps [`ExecPtr`] `Copy`, lets it
/// live inline in a [`Value::Func`](crate::Value::Func) without indirection, and makes it a cheap
/// key for anything that needs to compare or hash program addresses (the content-addressable
/// store among them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ExecPtr(u64);

/// Block id reserved for the program's main block.
pub const MAIN_BLOCK: u32 = 0;

impl ExecPtr {
    /// Builds a pointer to the first instruction of `block_id`.
    pub const fn entry(block_id: u32) -> Self {
        Self::new(block_id, 0)
    }

    /// Builds a pointer from an explicit block id and byte offset.
    pub const fn new(block_id: u32, offset: u32) -> Self {
        Self(((block_id as u64) << 32) | (offset as u64))
    }

    /// The block this pointer addresses.
    pub const fn block_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The byte offset within [`Self::block_id`].
    pub const fn offset(self) -> u32 {
        self.0 as u32
    }

    /// True when this pointer addresses the program's main block.
    pub const fn is_main(self) -> bool {
        self.block_id() == MAIN_BLOCK
    }

    /// Returns a pointer advanced by `by` bytes within the same block.
    #[must_use]
    pub const fn advance(self, by: u32) -> Self {
        Self::new(self.block_id(), self.offset() + by)
    }

    /// Returns a pointer to the same block with `offset` replacing the current one.
    ///
    /// Used by jump opcodes, which address a label as an absolute offset rather than a relative
    /// displacement.
    #[must_use]
    pub const fn with_offset(self, offset: u32) -> Self {
        Self::new(self.block_id(), offset)
    }
}

impl fmt::Display for ExecPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            write!(f, "main+{}", self.offset())
        } else {
            write!(f, "fn{}+{}", self.block_id(), self.offset())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_block_and_offset() {
        let ptr = ExecPtr::new(3, 128);
        assert_eq!(ptr.block_id(), 3);
        assert_eq!(ptr.offset(), 128);
    }

    #[test]
    fn advance_stays_within_block() {
        let ptr = ExecPtr::entry(5).advance(4).advance(4);
        assert_eq!(ptr, ExecPtr::new(5, 8));
    }

    #[test]
    fn main_block_is_zero() {
        assert!(ExecPtr::entry(MAIN_BLOCK).is_main());
        assert!(!ExecPtr::entry(1).is_main());
    }
}
