//! At-rest protection for credential blobs.

pub mod credential_cipher;

pub use credential_cipher::AesCredentialCipher;
