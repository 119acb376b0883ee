//! Stable signatures for ports and hash links.
//!
//! Signatures must hash identically across processes and compiler versions,
//! so they are derived with blake3 over domain-separated labels and truncated
//! to 64 bits.
use blake3::Hasher;

/// Truncated port / hash-link signature.
pub type Signature = u64;

fn finish(hasher: Hasher) -> Signature {
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Signature of an external (boundary) port: `blake3("port:" || asset || 0 || name)`.
///
/// Every instance of the same asset exposes the same boundary signatures, which
/// is what lets a subgraph node match its mirrored ports against the child graph.
pub fn external_port(asset_id: &str, name: &str) -> Signature {
    let mut hasher = Hasher::new();
    hasher.update(b"port:");
    hasher.update(asset_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(name.as_bytes());
    finish(hasher)
}

/// Signature of a regular port, unique per node inside one asset.
pub fn internal_port(asset_id: &str, node_key: &str, index: usize) -> Signature {
    let mut hasher = Hasher::new();
    hasher.update(b"port:");
    hasher.update(asset_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(node_key.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(index as u64).to_le_bytes());
    finish(hasher)
}

/// Hash-link signature for a free-form label (event names, channels).
pub fn hash_link(label: &str) -> Signature {
    let mut hasher = Hasher::new();
    hasher.update(b"hash-link:");
    hasher.update(label.as_bytes());
    finish(hasher)
}
