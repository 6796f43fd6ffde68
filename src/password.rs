//! Password hashing and verification using bcrypt.
//!
//! The cost factor is tunable through server configuration. A mismatched
//! password is a `false` result, never an error; errors are reserved for
//! infrastructure failures (entropy, malformed stored hash).

/// Default bcrypt cost.
pub const DEFAULT_COST: u32 = 10;

#[derive(Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password with a random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(HashError)
    }

    /// Verify a plaintext password against a stored hash.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, HashError> {
        bcrypt::verify(plaintext, hash).map_err(HashError)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

/// Infrastructure failure in the hashing backend.
#[derive(Debug)]
pub struct HashError(bcrypt::BcryptError);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the test suite fast.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let h = hasher();
        let hash = h.hash("secret1").unwrap();

        assert!(h.verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let h = hasher();
        let hash = h.hash("secret1").unwrap();

        assert!(!h.verify("secret2", &hash).unwrap());
        assert!(!h.verify("", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let h = hasher();
        let first = h.hash("secret1").unwrap();
        let second = h.hash("secret1").unwrap();

        assert_ne!(first, second);
        assert!(h.verify("secret1", &first).unwrap());
        assert!(h.verify("secret1", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let h = hasher();
        assert!(h.verify("secret1", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(PasswordHasher::default().cost, DEFAULT_COST);
    }
}
