//! AES-256-GCM credential vault with per-envelope PBKDF2 keys.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use sha2::Sha512;

use creatorsync_core::EncryptedCredential;

use crate::envelope::{Envelope, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::CryptoError;

/// AES-256-GCM with a 128-bit nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Lowest accepted PBKDF2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;

/// Encrypts and decrypts credential strings with a long-term secret.
///
/// Each [`encrypt`](Self::encrypt) call draws a fresh salt and nonce, so two
/// envelopes for the same plaintext never match.
#[derive(Clone)]
pub struct CredentialVault {
    secret: Vec<u8>,
    iterations: u32,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("secret", &"[redacted]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl CredentialVault {
    /// Creates a vault using [`MIN_KDF_ITERATIONS`] key-derivation rounds.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptySecret`] if `secret` is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CryptoError> {
        Self::with_iterations(secret, MIN_KDF_ITERATIONS)
    }

    /// Creates a vault with a custom key-derivation cost.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptySecret`] for an empty secret and
    /// [`CryptoError::WeakKdf`] below [`MIN_KDF_ITERATIONS`].
    pub fn with_iterations(secret: impl AsRef<[u8]>, iterations: u32) -> Result<Self, CryptoError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        if iterations < MIN_KDF_ITERATIONS {
            return Err(CryptoError::WeakKdf {
                requested: iterations,
                minimum: MIN_KDF_ITERATIONS,
            });
        }
        Ok(Self {
            secret: secret.to_vec(),
            iterations,
        })
    }

    /// Seals `plaintext` into an envelope string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encrypt`] if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let cipher = self.cipher(&salt)?;
        let mut sealed = cipher
            .encrypt(Nonce::<U16>::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        // aes-gcm appends the tag to the ciphertext.
        let tag_start = sealed.len() - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&sealed[tag_start..]);
        sealed.truncate(tag_start);

        Ok(Envelope {
            salt,
            nonce,
            ciphertext: sealed,
            tag,
        }
        .encode())
    }

    /// Opens an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns the envelope parse errors from [`Envelope::decode`],
    /// [`CryptoError::Authentication`] on tag mismatch or wrong key, and
    /// [`CryptoError::Utf8`] if the plaintext is not UTF-8. No partial
    /// plaintext is ever returned.
    pub fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let envelope = Envelope::decode(envelope)?;
        let cipher = self.cipher(&envelope.salt)?;

        let mut sealed = envelope.ciphertext;
        sealed.extend_from_slice(&envelope.tag);

        let plaintext = cipher
            .decrypt(Nonce::<U16>::from_slice(&envelope.nonce), sealed.as_slice())
            .map_err(|_| CryptoError::Authentication)?;

        Ok(String::from_utf8(plaintext)?)
    }

    fn cipher(&self, salt: &[u8; SALT_LEN]) -> Result<Aes256Gcm16, CryptoError> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha512>(&self.secret, salt, self.iterations, &mut key);
        Aes256Gcm16::new_from_slice(&key).map_err(|_| CryptoError::Encrypt)
    }
}

/// Encrypts an access token and optional refresh token into a credential.
///
/// # Errors
///
/// Propagates [`CryptoError`] from [`CredentialVault::encrypt`].
pub fn encrypt_credential(
    vault: &CredentialVault,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<EncryptedCredential, CryptoError> {
    Ok(EncryptedCredential {
        access_token: Some(vault.encrypt(access_token)?),
        refresh_token: refresh_token.map(|t| vault.encrypt(t)).transpose()?,
        expires_at,
    })
}

/// Decrypts the access token of a stored credential.
///
/// # Errors
///
/// Returns [`CryptoError::MissingToken`] if no access token is stored, or
/// any decryption error.
pub fn decrypt_access_token(
    vault: &CredentialVault,
    credential: &EncryptedCredential,
) -> Result<String, CryptoError> {
    let envelope = credential
        .access_token
        .as_deref()
        .ok_or(CryptoError::MissingToken("access"))?;
    vault.decrypt(envelope)
}

/// Decrypts the refresh token of a stored credential.
///
/// # Errors
///
/// Returns [`CryptoError::MissingToken`] if no refresh token is stored, or
/// any decryption error.
pub fn decrypt_refresh_token(
    vault: &CredentialVault,
    credential: &EncryptedCredential,
) -> Result<String, CryptoError> {
    let envelope = credential
        .refresh_token
        .as_deref()
        .ok_or(CryptoError::MissingToken("refresh"))?;
    vault.decrypt(envelope)
}
