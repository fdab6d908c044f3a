//! X25519 public-key stanza
//!
//! ```text
//! -> X25519 <base64(ephemeral share)>
//! <base64(ChaCha20-Poly1305(wrap key, zero nonce, file key))>
//! ```
//!
//! The wrap key is HKDF-SHA256 over the shared secret, salted with
//! `ephemeral share || recipient public key`.

use crate::{
    header::{b64_decode, b64_encode, Stanza},
    keys::{FileKey, KeyPair, PublicKey, SecretKey},
    recipient::{Identity, Recipient},
    symmetric::{hkdf_sha256, open_file_key, seal_file_key},
    CryptoError, Result,
};
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;
use tracing::trace;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};

/// Stanza tag
pub const X25519_TAG: &str = "X25519";

/// HKDF info label for the wrap key
const X25519_LABEL: &[u8] = b"age-encryption.org/v1/X25519";

fn wrap_key_salt(share: &[u8; 32], recipient: &[u8; 32]) -> [u8; 64] {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(share);
    salt[32..].copy_from_slice(recipient);
    salt
}

/// Encrypts to an `age1...` public key
#[derive(Clone)]
pub struct X25519Recipient {
    public: PublicKey,
}

impl X25519Recipient {
    /// Create a recipient for the given public key
    pub fn new(public: PublicKey) -> Self {
        Self { public }
    }

    /// The recipient's public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl Recipient for X25519Recipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let share = X25519Public::from(&ephemeral);

        let shared = ephemeral.diffie_hellman(&X25519Public::from(*self.public.as_bytes()));
        if !shared.was_contributory() {
            return Err(CryptoError::Encryption(
                "X25519 recipient is a low-order point".to_string(),
            ));
        }

        let salt = wrap_key_salt(share.as_bytes(), self.public.as_bytes());
        let wrap_key = hkdf_sha256(shared.as_bytes(), Some(salt.as_slice()), X25519_LABEL)?;
        let body = seal_file_key(&wrap_key, file_key)?;

        Ok(vec![Stanza::new(
            [X25519_TAG.to_string(), b64_encode(share.as_bytes())],
            body,
        )])
    }
}

impl FromStr for X25519Recipient {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse().map(Self::new)
    }
}

impl fmt::Display for X25519Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.public, f)
    }
}

impl fmt::Debug for X25519Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("X25519Recipient").field(&self.public).finish()
    }
}

/// Decrypts with an `AGE-SECRET-KEY-1...` secret key
#[derive(Clone)]
pub struct X25519Identity {
    keypair: KeyPair,
}

impl X25519Identity {
    /// Create an identity from a secret key
    pub fn new(secret: SecretKey) -> Self {
        Self {
            keypair: KeyPair::from_secret_key(secret),
        }
    }

    /// Generate a fresh identity
    pub fn generate() -> Self {
        Self {
            keypair: KeyPair::generate(),
        }
    }

    /// The recipient that encrypts to this identity
    pub fn to_recipient(&self) -> X25519Recipient {
        X25519Recipient::new(*self.keypair.public_key())
    }

    /// The underlying key pair
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        if stanza.args.len() != 2 {
            return Err(CryptoError::format("invalid X25519 stanza"));
        }
        let share: [u8; 32] = b64_decode(&stanza.args[1])?
            .try_into()
            .map_err(|_| CryptoError::format("invalid X25519 stanza"))?;

        let secret = StaticSecret::from(*self.keypair.secret_key().as_bytes());
        let shared = secret.diffie_hellman(&X25519Public::from(share));
        if !shared.was_contributory() {
            return Err(CryptoError::format("invalid X25519 stanza: low-order share"));
        }

        let salt = wrap_key_salt(&share, self.keypair.public_key().as_bytes());
        let wrap_key = hkdf_sha256(shared.as_bytes(), Some(salt.as_slice()), X25519_LABEL)?;

        open_file_key(&wrap_key, &stanza.body)
    }
}

impl Identity for X25519Identity {
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        for (index, stanza) in stanzas.iter().enumerate() {
            if stanza.tag() != Some(X25519_TAG) {
                continue;
            }
            if let Some(file_key) = self.unwrap_stanza(stanza)? {
                trace!(stanza = index, "X25519 stanza matched");
                return Ok(Some(file_key));
            }
        }
        Ok(None)
    }
}

impl FromStr for X25519Identity {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse().map(Self::new)
    }
}

impl fmt::Debug for X25519Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X25519Identity")
            .field("public", self.keypair.public_key())
            .finish_non_exhaustive()
    }
}
