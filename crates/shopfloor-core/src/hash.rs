//! Non-cryptographic FNV-1a hashing for stream keys and state digests.

use crate::fixed::Fixed64;

const FNV32_OFFSET: u32 = 0x811C_9DC5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a of a string key. Stable across runs and platforms, unlike
/// `std::hash`, which is randomly seeded per process.
pub fn fnv1a_32(key: &str) -> u32 {
    let mut h = FNV32_OFFSET;
    for &b in key.as_bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(FNV32_PRIME);
    }
    h
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Incremental 64-bit FNV-1a over inventory state. Two runs that agree on
/// every batch and capacity produce the same digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub fn new() -> Self {
        Self(Self::OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Feed a string, length-prefixed so that `("ab", "c")` and `("a", "bc")`
    /// hash differently.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_32_known_vectors() {
        assert_eq!(fnv1a_32(""), 0x811C_9DC5);
        assert_eq!(fnv1a_32("a"), 0xE40C_292C);
        assert_eq!(fnv1a_32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn same_writes_same_digest() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_str("Warehouse_A");
        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_str("Warehouse_A");
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_strings_are_length_prefixed() {
        let mut h1 = StateHash::new();
        h1.write_str("ab");
        h1.write_str("c");
        let mut h2 = StateHash::new();
        h2.write_str("a");
        h2.write_str("bc");
        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn one_field_changes_the_digest() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        let mut h2 = StateHash::new();
        h2.write_u32(2);
        assert_ne!(h1.finish(), h2.finish());
    }
}
