use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("vault secret must not be empty")]
    EmptySecret,

    #[error("key derivation needs at least {minimum} iterations, got {requested}")]
    WeakKdf { requested: u32, minimum: u32 },

    #[error("malformed envelope: expected 4 segments, found {found}")]
    SegmentCount { found: usize },

    #[error("malformed envelope: {segment} is not valid base64")]
    Base64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("malformed envelope: {segment} must be {expected} bytes, got {actual}")]
    SegmentLength {
        segment: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("envelope failed authentication (tampered data or wrong key)")]
    Authentication,

    #[error("encryption failed")]
    Encrypt,

    #[error("decrypted credential is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("credential has no {0} token")]
    MissingToken(&'static str),
}
