//! Content-addressable store: serialises entities into a type-tagged byte blob, hashes the
//! bytes, and deduplicates (§4.2).
//!
//! This crate knows nothing about states, frames, or values — it is a generic
//! hash-and-store primitive. The higher layers (`tw-interp`, `tw-explore`) define their own
//! "stored shadow" types (implementing [`StoreEntry`]) that decompose their live domain objects
//! into [`Slot`]s of child hashes, which is what gives the store its structural sharing.

mod cache;
mod hash;
mod slot;
mod store;

pub use hash::Hash;
pub use slot::{Slot, ARRAY_INLINE_MAX, MAP_INLINE_MAX};
pub use store::{CasError, Store, StoreEntry};
