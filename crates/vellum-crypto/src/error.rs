//! Error types for the vellum-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur while encrypting or decrypting a file
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Malformed header, stanza, base64 or payload framing
    #[error("invalid format: {0}")]
    Format(String),

    /// Header MAC mismatch or AEAD authentication failure on the payload
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Every configured identity declined every stanza
    #[error("no identity matched any of the file's recipients")]
    NoMatch,

    /// Conflicting or malformed encrypter/decrypter configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Invalid KDF cost parameters
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// A sealing primitive failed
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Coarse failure class of a [`CryptoError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed header, stanza, armor or payload framing
    Format,
    /// A MAC or AEAD tag did not verify
    Authentication,
    /// No identity unwrapped the file key
    NoMatch,
    /// Conflicting or invalid encrypter/decrypter setup
    Configuration,
    /// Invalid KDF cost parameters
    Parameter,
    /// A sealing primitive failed
    Encryption,
}

impl CryptoError {
    /// Shorthand for a format error
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Shorthand for an authentication error
    pub(crate) fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Shorthand for a configuration error
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The failure class, for callers that branch on it
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::NoMatch => ErrorKind::NoMatch,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Parameter(_) => ErrorKind::Parameter,
            Self::Encryption(_) => ErrorKind::Encryption,
        }
    }
}
