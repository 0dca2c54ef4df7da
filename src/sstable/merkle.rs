//! Merkle root over a run's sorted entries.
//!
//! The root is an integrity witness: it is a function solely of the sorted
//! entry sequence, so any bit flipped in `data` changes it. Leaf hashes are
//!
//! ```text
//! SHA-256(key ‖ value ‖ tombstone_byte ‖ le64(timestamp))
//! ```
//!
//! Internal levels pair hashes left to right; an odd trailing hash is
//! promoted unchanged to the next level. The root is stored as lowercase
//! hexadecimal text in the `merkle` sidecar.

use sha2::{Digest, Sha256};

use super::Entry;

/// Computes the hex-encoded Merkle root of a sorted entry slice.
///
/// An empty slice yields an empty string.
pub fn merkle_root(entries: &[Entry]) -> String {
    let mut level: Vec<[u8; 32]> = entries.iter().map(leaf_hash).collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut pairs = level.chunks_exact(2);
        for pair in &mut pairs {
            let mut hasher = Sha256::new();
            hasher.update(pair[0]);
            hasher.update(pair[1]);
            next.push(hasher.finalize().into());
        }
        if let [odd] = pairs.remainder() {
            next.push(*odd);
        }
        level = next;
    }

    match level.first() {
        Some(root) => to_hex(root),
        None => String::new(),
    }
}

fn leaf_hash(entry: &Entry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(&entry.key);
    hasher.update(&entry.value);
    hasher.update([u8::from(entry.tombstone)]);
    hasher.update(entry.timestamp.to_le_bytes());
    hasher.finalize().into()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
