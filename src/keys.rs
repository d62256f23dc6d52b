//! Key encoding for LMDB storage.
//!
//! String keys are length-prefixed: [len1][bytes1][len2][bytes2]...
//! - No delimiters, no escaping
//! - Each part is at most 255 bytes
//!
//! Id keys are fixed-width big-endian so prefix scans walk ids in order.

use crate::role::RoleId;

/// 16-byte key from two u64 values
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

/// Second half of a 16-byte key
#[inline]
pub fn key_suffix(k: &[u8]) -> Option<u64> {
    if k.len() != 16 {
        return None;
    }
    let mut b = [0u8; 8];
    b.copy_from_slice(&k[8..16]);
    Some(u64::from_be_bytes(b))
}

/// Build a length-prefixed key from parts
#[inline]
pub fn build_key(parts: &[&str]) -> Vec<u8> {
    let total_len: usize = parts.iter().map(|p| 1 + p.len()).sum();
    let mut key = Vec::with_capacity(total_len);
    for part in parts {
        key.push(part.len() as u8);
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Parse a length-prefixed key into parts. Stops at the first malformed part.
pub fn parse_key(bytes: &[u8]) -> Vec<&str> {
    let mut parts = Vec::with_capacity(3);
    let mut i = 0;
    while i < bytes.len() {
        let len = bytes[i] as usize;
        if i + 1 + len > bytes.len() {
            break;
        }
        match std::str::from_utf8(&bytes[i + 1..i + 1 + len]) {
            Ok(p) => parts.push(p),
            Err(_) => break,
        }
        i += 1 + len;
    }
    parts
}

/// Uniqueness key for (role, board_uri, caste). `None` encodes as an empty
/// part; stored values are never empty.
#[inline]
pub fn role_index_key(role: &str, board: Option<&str>, caste: Option<&str>) -> Vec<u8> {
    build_key(&[role, board.unwrap_or(""), caste.unwrap_or("")])
}

/// Override key: [role id BE][len][permission]
pub fn override_key(role: RoleId, permission: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(9 + permission.len());
    k.extend_from_slice(&role.to_be_bytes());
    k.extend_from_slice(&build_key(&[permission]));
    k
}

#[inline]
pub fn override_prefix(role: RoleId) -> [u8; 8] {
    role.to_be_bytes()
}

/// Split an override key back into (role, permission)
pub fn parse_override(bytes: &[u8]) -> Option<(RoleId, &str)> {
    if bytes.len() < 9 {
        return None;
    }
    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes[..8]);
    let parts = parse_key(&bytes[8..]);
    match parts.as_slice() {
        [p] => Some((u64::from_be_bytes(id), *p)),
        _ => None,
    }
}
