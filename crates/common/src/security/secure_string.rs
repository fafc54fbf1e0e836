//! String wrapper that zeroes its memory on drop.
//!
//! Used for database passphrases and decrypted credential JSON so secrets do
//! not linger in freed heap memory.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret string; never printed by `Debug` or `Display`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub fn new(value: impl Into<String>) -> Self {
        Self { inner: value.into() }
    }

    /// Borrow the secret. Do not store or log the result.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Constant-time equality.
    pub fn constant_time_eq(&self, other: &Self) -> bool {
        let (a, b) = (self.inner.as_bytes(), other.inner.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString(***)")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_hides_value() {
        let secret = SecureString::new("p@ss");
        assert_eq!(format!("{secret:?}"), "SecureString(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "p@ss");
    }

    #[test]
    fn constant_time_comparison() {
        let a = SecureString::new("abc");
        assert!(a.constant_time_eq(&SecureString::new("abc")));
        assert!(!a.constant_time_eq(&SecureString::new("abd")));
        assert!(!a.constant_time_eq(&SecureString::new("ab")));
    }
}
