//! # Vellum Crypto
//!
//! File encryption in the `age-encryption.org/v1` format.
//!
//! This crate provides:
//! - **Header codec**: stanzas, canonical base64 and the header MAC
//! - **STREAM**: ChaCha20-Poly1305 over 64 KiB chunks
//! - **scrypt**: a self-contained RFC 7914 implementation
//! - **Armor**: PEM-style text framing for encrypted files
//! - **Recipients**: X25519 public keys and scrypt passphrases, plus a trait
//!   for custom schemes
//!
//! ## Security Model
//!
//! - Every file gets a fresh 16-byte file key; recipients only ever wrap it
//! - The header is authenticated before any payload byte is decrypted
//! - Payload decryption is all-or-nothing: no partial plaintext on failure
//!
//! ## Example
//!
//! ```rust
//! use vellum_crypto::{Decrypter, Encrypter, X25519Identity};
//!
//! let identity = X25519Identity::generate();
//!
//! let encrypter = Encrypter::with_recipients([identity.to_recipient()])?;
//! let file = encrypter.encrypt(b"Hello, World!")?;
//!
//! let mut decrypter = Decrypter::new();
//! decrypter.add_identity(identity);
//! assert_eq!(decrypter.decrypt(&file)?, b"Hello, World!");
//! # Ok::<(), vellum_crypto::CryptoError>(())
//! ```

pub mod armor;
pub mod decrypter;
pub mod encrypter;
pub mod error;
pub mod header;
pub mod keys;
pub mod passphrase;
pub mod recipient;
pub mod scrypt;
pub mod stream;
pub mod symmetric;
pub mod x25519;

pub use decrypter::Decrypter;
pub use encrypter::{Encrypter, EncrypterBuilder, RecipientSet};
pub use error::{CryptoError, ErrorKind, Result};
pub use header::{Header, ParsedHeader, Stanza};
pub use keys::{generate_identity, identity_to_recipient, FileKey, KeyPair, PublicKey, SecretKey};
pub use passphrase::{ScryptConfig, ScryptIdentity, ScryptRecipient};
pub use recipient::{AnyIdentity, AnyRecipient, Identity, Recipient};
pub use stream::Stream;
pub use x25519::{X25519Identity, X25519Recipient};

/// The format version line every header starts with
pub const FORMAT_VERSION: &str = header::VERSION_LINE;
