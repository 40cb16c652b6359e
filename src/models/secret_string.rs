//! A container for sensitive strings (API key, executor private keys).
//!
//! The content lives in a `SecretVec` that is zeroized on drop, never shows up in `Debug`
//! output and is compared in constant time.
use std::{fmt, sync::Mutex};

use secrets::SecretVec;
use zeroize::Zeroizing;

pub struct SecretString(Mutex<SecretVec<u8>>);

impl Clone for SecretString {
    fn clone(&self) -> Self {
        let secret_vec = self.with_secret_vec(|secret_vec| secret_vec.clone());
        Self(Mutex::new(secret_vec))
    }
}

impl SecretString {
    pub fn new(s: &str) -> Self {
        let bytes = Zeroizing::new(s.as_bytes().to_vec());
        let secret_vec = SecretVec::new(bytes.len(), |buffer| {
            buffer.copy_from_slice(&bytes);
        });
        Self(Mutex::new(secret_vec))
    }

    fn with_secret_vec<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SecretVec<u8>) -> R,
    {
        let guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&guard)
    }

    /// Gives temporary access to the content without copying it.
    pub fn as_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        self.with_secret_vec(|secret_vec| {
            let bytes = secret_vec.borrow();
            f(std::str::from_utf8(&bytes).unwrap_or_default())
        })
    }

    /// Copies the content into a buffer that is erased when dropped.
    pub fn to_str(&self) -> Zeroizing<String> {
        self.as_str(|s| Zeroizing::new(s.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.with_secret_vec(|secret_vec| secret_vec.is_empty())
    }

    /// Constant time comparison against a plain string, e.g. a request header.
    pub fn matches(&self, candidate: &str) -> bool {
        self.with_secret_vec(|secret_vec| {
            let bytes = secret_vec.borrow();
            bytes.len() == candidate.len()
                && subtle::ConstantTimeEq::ct_eq(&*bytes, candidate.as_bytes()).into()
        })
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        other.as_str(|s| self.matches(s))
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SecretString(REDACTED)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let secret = SecretString::new("test_secret_value");
        secret.as_str(|s| assert_eq!(s, "test_secret_value"));
        assert_eq!(&*secret.to_str(), "test_secret_value");
    }

    #[test]
    fn test_empty() {
        assert!(SecretString::new("").is_empty());
        assert!(!SecretString::new("x").is_empty());
    }

    #[test]
    fn test_matches() {
        let secret = SecretString::new("api-key");
        assert!(secret.matches("api-key"));
        assert!(!secret.matches("api-kez"));
        assert!(!secret.matches("api"));
        assert_eq!(secret, SecretString::new("api-key"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::new("hidden");
        assert_eq!(format!("{:?}", secret), "SecretString(REDACTED)");
        assert_eq!(format!("{:?}", secret.clone()), "SecretString(REDACTED)");
    }
}
