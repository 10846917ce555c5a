//! One-time Secret Hashing
//!
//! Short-lived secrets (email OTPs) are stored only as salted Argon2id
//! hashes in PHC format. The plaintext lives in a [`OneTimeSecret`] which
//! is zeroized on drop and redacted in debug output.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SecretHashError {
    /// Parameters rejected by argon2
    #[error("Invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Hashing operation failed
    #[error("Secret hashing failed: {0}")]
    HashingFailed(String),

    /// Stored value is not a PHC string
    #[error("Invalid secret hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Parameters
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    /// OWASP baseline: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashParams {
    /// Cheapest parameters argon2 accepts; for tests only
    pub const fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

// ============================================================================
// Plaintext secret (zeroized on drop)
// ============================================================================

/// Plaintext one-time secret
///
/// Not `Clone`; the value is wiped from memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct OneTimeSecret(String);

impl OneTimeSecret {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Plaintext, for delivery to its owner only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OneTimeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OneTimeSecret").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// Hasher
// ============================================================================

/// Argon2id hasher with fixed cost parameters
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl SecretHasher {
    pub fn new(params: HashParams) -> Result<Self, SecretHashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| SecretHashError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash with a fresh 128-bit random salt
    pub fn hash(&self, secret: &OneTimeSecret) -> Result<HashedSecret, SecretHashError> {
        let salt = SaltString::generate(OsRng);
        let hash = self
            .argon2
            .hash_password(secret.expose().as_bytes(), &salt)
            .map_err(|e| SecretHashError::HashingFailed(e.to_string()))?;

        Ok(HashedSecret {
            hash: hash.to_string(),
        })
    }

    /// Verify a submitted plaintext against a stored hash
    ///
    /// Cost parameters are read from the PHC string, so hashes produced
    /// under older parameters still verify.
    pub fn verify(&self, hashed: &HashedSecret, submitted: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&hashed.hash) else {
            return false;
        };
        self.argon2
            .verify_password(submitted.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHasher").finish_non_exhaustive()
    }
}

// ============================================================================
// Hashed secret (safe to store)
// ============================================================================

/// Salted hash in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedSecret {
    hash: String,
}

impl HashedSecret {
    /// Restore from storage
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, SecretHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| SecretHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HashedSecret").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> SecretHasher {
        SecretHasher::new(HashParams::minimal()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let secret = OneTimeSecret::new("482913");
        let hashed = hasher.hash(&secret).unwrap();

        assert!(hashed.as_phc_string().starts_with("$argon2id$"));
        assert!(hasher.verify(&hashed, "482913"));
        assert!(!hasher.verify(&hashed, "482914"));
    }

    #[test]
    fn test_salted() {
        let hasher = hasher();
        let a = hasher.hash(&OneTimeSecret::new("000000")).unwrap();
        let b = hasher.hash(&OneTimeSecret::new("000000")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_phc_roundtrip_from_storage() {
        let hasher = hasher();
        let hashed = hasher.hash(&OneTimeSecret::new("123456")).unwrap();
        let restored = HashedSecret::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(hasher.verify(&restored, "123456"));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(matches!(
            HashedSecret::from_phc_string("not a hash"),
            Err(SecretHashError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = OneTimeSecret::new("482913");
        assert!(!format!("{:?}", secret).contains("482913"));
    }

    #[test]
    fn test_invalid_params() {
        let params = HashParams {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        };
        assert!(matches!(
            SecretHasher::new(params),
            Err(SecretHashError::InvalidParams(_))
        ));
    }
}
