//! Encryption key management using the system keyring
//!
//! Resolves a [`KeySource`] to a 256-bit key in hex form. Keychain-backed
//! keys are generated on first use and stored under the configured
//! service/account pair.

use keyring::Entry;
use rand::Rng;
use ticketsync_common::SecureString;
use ticketsync_domain::{KeySource, Result, TicketSyncError};
use tracing::info;

use crate::errors::conversions::to_domain;

const KEY_BYTES: usize = 32;

/// Manages encryption keys using the system keyring
pub struct KeyManager;

impl KeyManager {
    /// Hex-encoded key for `source`.
    pub fn resolve(source: &KeySource) -> Result<SecureString> {
        match source {
            KeySource::Direct { hex_key } => {
                let valid =
                    hex_key.len() == KEY_BYTES * 2 && hex_key.chars().all(|c| c.is_ascii_hexdigit());
                if !valid {
                    return Err(TicketSyncError::Configuration(
                        "direct keys must be 64 hex characters".into(),
                    ));
                }
                Ok(SecureString::new(hex_key.clone()))
            }
            KeySource::Keychain { service, account } => Self::get_or_create_key(service, account),
        }
    }

    /// Get the key stored under `service`/`account`, generating and storing
    /// a new one when the entry does not exist yet.
    pub fn get_or_create_key(service: &str, account: &str) -> Result<SecureString> {
        let entry = Entry::new(service, account).map_err(|e| {
            TicketSyncError::Security(format!("Failed to access keyring: {e}"))
        })?;

        match entry.get_password() {
            Ok(key) => Ok(SecureString::new(key)),
            Err(keyring::Error::NoEntry) => {
                let key = Self::generate_key();
                entry.set_password(key.expose()).map_err(to_domain)?;
                info!(service, account, "Generated new encryption key in keychain");
                Ok(key)
            }
            Err(err) => Err(to_domain(err)),
        }
    }

    /// Generate a new random 256-bit key, hex encoded
    pub fn generate_key() -> SecureString {
        let mut rng = rand::thread_rng();
        let key: Vec<u8> = (0..KEY_BYTES).map(|_| rng.gen()).collect();
        SecureString::new(hex::encode(key))
    }

    /// Delete the stored key (use with caution!)
    ///
    /// Anything encrypted under the key becomes unreadable.
    pub fn delete_key(service: &str, account: &str) -> Result<()> {
        let entry = Entry::new(service, account).map_err(to_domain)?;
        entry.delete_credential().map_err(to_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_64_hex_chars() {
        let key = KeyManager::generate_key();
        assert_eq!(key.len(), 64);
        assert!(key.expose().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!key.constant_time_eq(&KeyManager::generate_key()));
    }

    #[test]
    fn direct_source_resolves_without_keychain() {
        let hex_key = "ab".repeat(32);
        let key = KeyManager::resolve(&KeySource::Direct { hex_key: hex_key.clone() }).unwrap();
        assert_eq!(key.expose(), hex_key);
    }

    #[test]
    fn malformed_direct_key_is_configuration_error() {
        let err = KeyManager::resolve(&KeySource::Direct { hex_key: "xyz".into() }).unwrap_err();
        assert!(matches!(err, TicketSyncError::Configuration(_)));
    }
}
