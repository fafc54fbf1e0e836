//! AES-256-GCM [`CredentialCipher`] backed by the common encryption service.
//!
//! Writes use the `v1.` envelope (base64 of nonce followed by ciphertext).
//! Reads also accept the older `base64(nonce):base64(ciphertext)` layout so
//! rows written before the envelope change stay readable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ticketsync_common::{EncryptionService, SecureString};
use ticketsync_core::CredentialCipher;
use ticketsync_domain::{Result, TicketSyncError};
use tracing::debug;

const LEGACY_DELIMITER: char = ':';

pub struct AesCredentialCipher {
    service: EncryptionService,
}

impl AesCredentialCipher {
    /// Cipher keyed by a 64-character hex key.
    pub fn from_hex_key(hex_key: &SecureString) -> Result<Self> {
        let service = EncryptionService::from_hex_key(hex_key.expose())
            .map_err(|e| TicketSyncError::Security(format!("invalid credential key: {e}")))?;
        Ok(Self { service })
    }

    fn open_legacy(&self, ciphertext: &str) -> Option<Vec<u8>> {
        let (nonce, body) = ciphertext.split_once(LEGACY_DELIMITER)?;
        let nonce = BASE64.decode(nonce).ok()?;
        let body = BASE64.decode(body).ok()?;
        self.service.decrypt_parts(&nonce, &body).ok()
    }
}

impl CredentialCipher for AesCredentialCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.service
            .seal_to_string(plaintext.as_bytes())
            .map_err(|e| TicketSyncError::Security(format!("credential encryption failed: {e}")))
    }

    fn decrypt(&self, ciphertext: &str) -> Option<String> {
        let plaintext = if ciphertext.starts_with("v1.") {
            self.service.open_from_string(ciphertext).ok()
        } else {
            self.open_legacy(ciphertext)
        };

        match plaintext.map(String::from_utf8) {
            Some(Ok(text)) => Some(text),
            Some(Err(_)) => {
                debug!("decrypted credentials are not UTF-8");
                None
            }
            None => None,
        }
    }
}
