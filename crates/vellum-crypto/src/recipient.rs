//! Recipient and identity capabilities
//!
//! A [`Recipient`] wraps a file key into header stanzas; an [`Identity`]
//! tries to unwrap one back. The built-in schemes are dispatched through
//! [`AnyRecipient`] / [`AnyIdentity`]; anything else plugs in through the
//! `Custom` variants.

use crate::{
    header::Stanza,
    keys::FileKey,
    passphrase::ScryptIdentity,
    x25519::{X25519Identity, X25519Recipient},
    Result,
};
use std::fmt;

/// Wraps a file key for one party
pub trait Recipient {
    /// Produce the stanzas that carry `file_key` for this recipient
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>>;
}

/// Recovers a file key from a header's stanzas
pub trait Identity {
    /// Try to unwrap the file key.
    ///
    /// Returns `Ok(None)` when no stanza belongs to this identity. Errors are
    /// reserved for stanzas of a recognized type that are structurally
    /// malformed.
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>>;
}

/// A recipient that can be listed alongside others in one file
pub enum AnyRecipient {
    /// `age1...` public key
    X25519(X25519Recipient),
    /// Caller-supplied scheme
    Custom(Box<dyn Recipient + Send + Sync>),
}

impl AnyRecipient {
    /// Wrap a user-supplied recipient
    pub fn custom<R: Recipient + Send + Sync + 'static>(recipient: R) -> Self {
        Self::Custom(Box::new(recipient))
    }
}

impl Recipient for AnyRecipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        match self {
            Self::X25519(r) => r.wrap_file_key(file_key),
            Self::Custom(r) => r.wrap_file_key(file_key),
        }
    }
}

impl From<X25519Recipient> for AnyRecipient {
    fn from(recipient: X25519Recipient) -> Self {
        Self::X25519(recipient)
    }
}

impl fmt::Debug for AnyRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X25519(r) => f.debug_tuple("X25519").field(r).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Any identity a decrypter can try
pub enum AnyIdentity {
    /// `AGE-SECRET-KEY-1...` secret key
    X25519(X25519Identity),
    /// Passphrase
    Scrypt(ScryptIdentity),
    /// Caller-supplied scheme
    Custom(Box<dyn Identity + Send + Sync>),
}

impl AnyIdentity {
    /// Wrap a user-supplied identity
    pub fn custom<I: Identity + Send + Sync + 'static>(identity: I) -> Self {
        Self::Custom(Box::new(identity))
    }
}

impl Identity for AnyIdentity {
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        match self {
            Self::X25519(i) => i.unwrap_file_key(stanzas),
            Self::Scrypt(i) => i.unwrap_file_key(stanzas),
            Self::Custom(i) => i.unwrap_file_key(stanzas),
        }
    }
}

impl From<X25519Identity> for AnyIdentity {
    fn from(identity: X25519Identity) -> Self {
        Self::X25519(identity)
    }
}

impl From<ScryptIdentity> for AnyIdentity {
    fn from(identity: ScryptIdentity) -> Self {
        Self::Scrypt(identity)
    }
}

impl fmt::Debug for AnyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X25519(i) => f.debug_tuple("X25519").field(i).finish(),
            Self::Scrypt(i) => f.debug_tuple("Scrypt").field(i).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
