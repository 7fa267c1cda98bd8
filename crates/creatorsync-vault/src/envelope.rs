//! Wire layout of an encrypted credential.
//!
//! `base64(salt) ":" base64(nonce) ":" base64(ciphertext) ":" base64(tag)`
//! using the standard padded alphabet. Salt is 64 bytes, nonce 16, tag 16;
//! the ciphertext is as long as the plaintext.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::CryptoError;

pub const SALT_LEN: usize = 64;
pub const NONCE_LEN: usize = 16;
pub const TAG_LEN: usize = 16;

const SEPARATOR: &str = ":";

/// Decoded envelope segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Serialize to the persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        [
            BASE64.encode(self.salt),
            BASE64.encode(self.nonce),
            BASE64.encode(&self.ciphertext),
            BASE64.encode(self.tag),
        ]
        .join(SEPARATOR)
    }

    /// Parse the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SegmentCount`] unless the input splits into
    /// exactly four segments, [`CryptoError::Base64`] for undecodable
    /// segments, and [`CryptoError::SegmentLength`] for wrong-sized salt,
    /// nonce, or tag.
    pub fn decode(raw: &str) -> Result<Self, CryptoError> {
        let parts: Vec<&str> = raw.trim().split(SEPARATOR).collect();
        let [salt, nonce, ciphertext, tag] = parts.as_slice() else {
            return Err(CryptoError::SegmentCount { found: parts.len() });
        };

        Ok(Self {
            salt: fixed::<SALT_LEN>("salt", salt)?,
            nonce: fixed::<NONCE_LEN>("nonce", nonce)?,
            ciphertext: decode_segment("ciphertext", ciphertext)?,
            tag: fixed::<TAG_LEN>("tag", tag)?,
        })
    }
}

fn decode_segment(segment: &'static str, raw: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(raw)
        .map_err(|source| CryptoError::Base64 { segment, source })
}

fn fixed<const N: usize>(segment: &'static str, raw: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode_segment(segment, raw)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| CryptoError::SegmentLength {
        segment,
        expected: N,
        actual,
    })
}
