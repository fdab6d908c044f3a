//! Key material
//!
//! - [`FileKey`]: 16 random bytes per encrypted file, wrapped for every recipient
//! - [`DerivedKey`]: a single-use 32-byte key from HKDF or scrypt
//! - [`PublicKey`] / [`SecretKey`]: X25519 keys, with their Bech32 text forms
//!   `age1...` (recipient) and `AGE-SECRET-KEY-1...` (identity)

use crate::{CryptoError, Result};
use bech32::{FromBase32, ToBase32, Variant};
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of a file key in bytes (128 bits)
pub const FILE_KEY_SIZE: usize = 16;

/// Size of derived and X25519 keys in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Bech32 human-readable part of a recipient
pub const RECIPIENT_HRP: &str = "age";

/// Bech32 human-readable part of an identity
pub const IDENTITY_HRP: &str = "age-secret-key-";

/// Literal prefix of a recipient string
pub const RECIPIENT_PREFIX: &str = "age1";

/// Literal prefix of an identity string
pub const IDENTITY_PREFIX: &str = "AGE-SECRET-KEY-1";

/// The per-file symmetric secret every recipient wraps
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FileKey {
    key: [u8; FILE_KEY_SIZE],
}

impl FileKey {
    /// Generate a new random file key
    pub fn generate() -> Self {
        let mut key = [0u8; FILE_KEY_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut key);
        Self { key }
    }

    /// Create a file key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FILE_KEY_SIZE {
            return Err(CryptoError::format(format!(
                "file key must be {} bytes, got {}",
                FILE_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; FILE_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; FILE_KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKey").field("key", &"[REDACTED]").finish()
    }
}

/// A 256-bit key derived for exactly one use (wrap, MAC or stream key)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Wrap raw key bytes
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey").field("key", &"[REDACTED]").finish()
    }
}

/// An X25519 public key; its text form is an `age1...` recipient
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    bytes: [u8; KEY_SIZE],
}

impl PublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::config(format!(
                "public key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode(RECIPIENT_HRP, self.bytes.to_base32(), Variant::Bech32)
            .map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        if !s.starts_with(RECIPIENT_PREFIX) {
            return Err(CryptoError::config("invalid recipient"));
        }
        let bytes = decode_bech32(s, RECIPIENT_HRP)
            .filter(|b| b.len() == KEY_SIZE)
            .ok_or_else(|| CryptoError::config("invalid recipient"))?;
        Self::from_bytes(&bytes)
    }
}

/// An X25519 secret key; its text form is an `AGE-SECRET-KEY-1...` identity
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    /// Generate a new random secret key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut bytes);
        Self { bytes }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::config(format!(
                "secret key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derive the public key from this secret key
    pub fn public_key(&self) -> PublicKey {
        use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
        let secret = StaticSecret::from(self.bytes);
        let public = X25519Public::from(&secret);
        PublicKey {
            bytes: *public.as_bytes(),
        }
    }

    /// Encode as an uppercase `AGE-SECRET-KEY-1...` identity string
    pub fn to_identity_string(&self) -> Result<Zeroizing<String>> {
        let encoded = Zeroizing::new(
            bech32::encode(IDENTITY_HRP, self.bytes.to_base32(), Variant::Bech32)
                .map_err(|e| CryptoError::Encryption(format!("bech32 encoding failed: {e}")))?,
        );
        Ok(Zeroizing::new(encoded.to_uppercase()))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl FromStr for SecretKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        if !s.starts_with(IDENTITY_PREFIX) {
            return Err(CryptoError::config("invalid identity"));
        }
        let bytes = Zeroizing::new(
            decode_bech32(s, IDENTITY_HRP)
                .filter(|b| b.len() == KEY_SIZE)
                .ok_or_else(|| CryptoError::config("invalid identity"))?,
        );
        Self::from_bytes(&bytes)
    }
}

/// An X25519 key pair
#[derive(Clone, Debug)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::generate())
    }

    /// Create from an existing secret key
    pub fn from_secret_key(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Get the secret key
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

/// Generate a fresh X25519 identity string
pub fn generate_identity() -> Result<Zeroizing<String>> {
    SecretKey::generate().to_identity_string()
}

/// Convert an identity string to its recipient string
pub fn identity_to_recipient(identity: &str) -> Result<String> {
    let secret: SecretKey = identity.parse()?;
    Ok(secret.public_key().to_string())
}

fn decode_bech32(s: &str, expected_hrp: &str) -> Option<Vec<u8>> {
    let (hrp, data, variant) = bech32::decode(s).ok()?;
    if !hrp.eq_ignore_ascii_case(expected_hrp) || variant != Variant::Bech32 {
        return None;
    }
    Vec::<u8>::from_base32(&data).ok()
}
