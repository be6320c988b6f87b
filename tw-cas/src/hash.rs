use std::fmt;
use std::hash::Hasher;

use twox_hash::XxHash64;

/// Fixed seed so that `Hash::of` is deterministic across processes and runs — required by the
/// "hash is a function of value" invariant (§8): two independent verification runs over the same
/// program must discover the same unique-states count.
const SEED: u64 = 0x54_57_5f_43_41_53_00_00; // "TW_CAS\0\0" as bytes, read as a u64.

/// A 64-bit, non-cryptographic, deterministic content fingerprint.
///
/// This is the store's identity: two entries hash equal iff their type-tagged bytes are
/// bit-for-bit equal (§3 Invariant 4, restated at the byte level rather than the domain-value
/// level the core data model states it at).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash(u64);

impl Hash {
    /// Hashes a type tag together with its payload bytes. The tag participates in the hash so
    /// that two different stored types with coincidentally identical payloads never collide.
    pub fn of_tagged(tag: &str, payload: &[u8]) -> Self {
        let mut hasher = XxHash64::with_seed(SEED);
        hasher.write_u32(tag.len() as u32);
        hasher.write(tag.as_bytes());
        hasher.write(payload);
        Self(hasher.finish())
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tag_and_payload_hash_equal() {
        assert_eq!(Hash::of_tagged("state", b"abc"), Hash::of_tagged("state", b"abc"));
    }

    #[test]
    fn different_tags_do_not_collide_on_shared_payload() {
        assert_ne!(Hash::of_tagged("state", b"abc"), Hash::of_tagged("frame", b"abc"));
    }
}
