//! Password hashing
//!
//! Salted SHA-256, iterated, stored as 64 hex characters next to a 32 hex
//! character salt.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of SHA-256 rounds applied to a password
pub const HASH_ROUNDS: u32 = 10_000;

const SALT_BYTES: usize = 16;

/// Generate a random hex-encoded salt
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a password with the given salt
///
/// # Examples
///
/// ```
/// use survey_common::auth::hash_password;
///
/// let hash = hash_password("hunter22", "00112233445566778899aabbccddeeff");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_password("hunter22", "00112233445566778899aabbccddeeff"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

/// Check a password against a stored hash and salt
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    if expected_hash.is_empty() {
        return false;
    }
    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), expected_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
