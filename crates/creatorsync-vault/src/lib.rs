//! Symmetric encryption of OAuth credentials at rest.
//!
//! Every secret is sealed into a self-describing envelope string
//! (`salt:nonce:ciphertext:tag`, base64 segments) so the long-term vault
//! secret is the only thing needed to open it again.

pub mod envelope;
pub mod error;
pub mod vault;

pub use envelope::Envelope;
pub use error::CryptoError;
pub use vault::{
    decrypt_access_token, decrypt_refresh_token, encrypt_credential, CredentialVault,
    MIN_KDF_ITERATIONS,
};
