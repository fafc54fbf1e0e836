//! AES-256-GCM encryption primitive.
//!
//! Every call to [`EncryptionService::encrypt`] draws a fresh 96-bit nonce
//! from the OS RNG, so encrypting the same plaintext twice yields different
//! output. The compact text envelope is
//!
//! ```text
//! v1.<base64(nonce || ciphertext+tag)>
//! ```
//!
//! which never contains `:` and is safe to store in a TEXT column.
//!
//! ```rust
//! use ticketsync_common::crypto::EncryptionService;
//!
//! let service = EncryptionService::new(&EncryptionService::generate_key())?;
//! let sealed = service.seal_to_string(b"token")?;
//! assert_eq!(service.open_from_string(&sealed)?, b"token");
//! # Ok::<(), ticketsync_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

const ENVELOPE_PREFIX: &str = "v1.";

/// Nonce and ciphertext (tag appended) of one encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedData {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// AES-256-GCM service bound to a single key.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Build from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::crypto(format!(
                "encryption key must be exactly {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CommonError::crypto(format!("failed to create cipher: {e}")))?;
        Ok(Self { cipher })
    }

    /// Build from a 64-character hex key.
    pub fn from_hex_key(hex_key: &str) -> CommonResult<Self> {
        let key = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| CommonError::crypto(format!("invalid hex key: {e}")))?,
        );
        Self::new(&key)
    }

    /// Random 32-byte key.
    pub fn generate_key() -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
        OsRng.fill_bytes(key.as_mut_slice());
        key
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> CommonResult<SealedData> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext)
            .map_err(|e| CommonError::crypto(format!("encryption failed: {e}")))?;
        Ok(SealedData { nonce, ciphertext })
    }

    /// Authenticate and decrypt. Fails on a wrong key or any tampering.
    pub fn decrypt(&self, sealed: &SealedData) -> CommonResult<Vec<u8>> {
        self.cipher
            .decrypt(&Nonce::from(sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|_| CommonError::crypto("decryption failed: authentication tag mismatch"))
    }

    /// Decrypt from separate nonce and ciphertext slices.
    pub fn decrypt_parts(&self, nonce: &[u8], ciphertext: &[u8]) -> CommonResult<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
            CommonError::crypto(format!("nonce must be {NONCE_LEN} bytes, got {}", nonce.len()))
        })?;
        self.decrypt(&SealedData { nonce, ciphertext: ciphertext.to_vec() })
    }

    /// Encrypt into the `v1.` text envelope.
    pub fn seal_to_string(&self, plaintext: &[u8]) -> CommonResult<String> {
        let sealed = self.encrypt(plaintext)?;
        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.ciphertext.len());
        payload.extend_from_slice(&sealed.nonce);
        payload.extend_from_slice(&sealed.ciphertext);
        Ok(format!("{ENVELOPE_PREFIX}{}", BASE64.encode(payload)))
    }

    /// Open a `v1.` text envelope.
    pub fn open_from_string(&self, envelope: &str) -> CommonResult<Vec<u8>> {
        let encoded = envelope
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| CommonError::crypto("unrecognized envelope version"))?;
        let payload = BASE64
            .decode(encoded)
            .map_err(|e| CommonError::serialization("base64", e.to_string()))?;
        if payload.len() <= NONCE_LEN {
            return Err(CommonError::crypto("envelope too short"));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        self.decrypt_parts(nonce, ciphertext)
    }
}
