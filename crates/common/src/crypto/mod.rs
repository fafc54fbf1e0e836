//! Symmetric encryption primitives used for credentials at rest.

pub mod encryption;

pub use encryption::{EncryptionService, SealedData, KEY_LEN, NONCE_LEN};
