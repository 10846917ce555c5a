//! Cryptographic Utilities

use rand::{Rng, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Longest numeric code that still fits a `u64` range
pub const MAX_NUMERIC_CODE_DIGITS: u32 = 18;

/// Generate a zero-padded numeric code of `digits` length from the OS CSPRNG
///
/// Every value in `0..10^digits` is equally likely, so consecutive codes
/// carry no relation to each other. `digits` is clamped to `1..=18`.
pub fn random_numeric_code(digits: u32) -> String {
    let digits = digits.clamp(1, MAX_NUMERIC_CODE_DIGITS);
    let upper = 10u64.pow(digits);
    let value = OsRng.gen_range(0..upper);
    format!("{:0width$}", value, width = digits as usize)
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Compare two secrets without leaking their length or common prefix
pub fn digest_eq(a: &str, b: &str) -> bool {
    constant_time_eq(&sha256(a.as_bytes()), &sha256(b.as_bytes()))
}
