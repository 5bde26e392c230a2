use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Deterministic provocation id: `pv_` + first 16 hex chars of
/// sha256(`<offset rounded to the second>|<kind>|<title>`).
pub fn provocation_id(start_offset_ms: u64, kind: &str, title: &str) -> String {
    let rounded = start_offset_ms.saturating_add(500) / 1000 * 1000;
    let digest = sha256_hex(format!("{rounded}|{kind}|{title}").as_bytes());
    format!("pv_{}", &digest[..16])
}
