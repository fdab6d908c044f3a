//! Symmetric building blocks shared by the stanzas and the orchestrators
//!
//! - HKDF-SHA256 derivation of wrap, header-MAC and payload keys
//! - ChaCha20-Poly1305 sealing of the file key into a stanza body
//! - HMAC-SHA256 over the header, verified in constant time
//!
//! Every key passed to [`seal_file_key`] is freshly derived and used once,
//! which is what makes the all-zero nonce safe.

use crate::{
    keys::{DerivedKey, FileKey, FILE_KEY_SIZE, KEY_SIZE},
    CryptoError, Result,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// HKDF info label for the header MAC key
pub const HEADER_KEY_LABEL: &[u8] = b"header";

/// HKDF info label for the payload stream key
pub const PAYLOAD_KEY_LABEL: &[u8] = b"payload";

/// Size of the random nonce that precedes the payload
pub const PAYLOAD_NONCE_SIZE: usize = 16;

/// Size of a sealed file key: key plus Poly1305 tag
pub const WRAPPED_KEY_SIZE: usize = FILE_KEY_SIZE + 16;

const ZERO_NONCE: [u8; 12] = [0u8; 12];

/// HKDF-SHA256 to a 32-byte key
pub fn hkdf_sha256(ikm: &[u8], salt: Option<&[u8]>, info: &[u8]) -> Result<DerivedKey> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| CryptoError::Encryption(format!("HKDF expand failed: {e}")))?;
    let key = DerivedKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}

/// Seal the file key under a single-use wrap key
pub fn seal_file_key(wrap_key: &DerivedKey, file_key: &FileKey) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrap_key.as_bytes()));
    cipher
        .encrypt(Nonce::from_slice(&ZERO_NONCE), file_key.as_bytes().as_slice())
        .map_err(|e| CryptoError::Encryption(format!("file key wrapping failed: {e}")))
}

/// Open a stanza body with a candidate wrap key
///
/// A body of the wrong length is malformed and fatal. An authentication
/// failure only means the key does not match, so it yields `None`.
pub fn open_file_key(wrap_key: &DerivedKey, body: &[u8]) -> Result<Option<FileKey>> {
    if body.len() != WRAPPED_KEY_SIZE {
        return Err(CryptoError::format(format!(
            "invalid stanza: body must be {} bytes, got {}",
            WRAPPED_KEY_SIZE,
            body.len()
        )));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrap_key.as_bytes()));
    match cipher.decrypt(Nonce::from_slice(&ZERO_NONCE), body) {
        Ok(mut plaintext) => {
            let key = FileKey::from_bytes(&plaintext);
            plaintext.zeroize();
            key.map(Some)
        }
        Err(_) => Ok(None),
    }
}

/// Compute the header MAC over `header_no_mac` (version line through `---`)
pub fn header_mac(file_key: &FileKey, header_no_mac: &[u8]) -> Result<[u8; 32]> {
    let mac = header_hmac(file_key, header_no_mac)?;
    Ok(mac.finalize().into_bytes().into())
}

/// Verify a parsed header MAC in constant time
pub fn verify_header_mac(file_key: &FileKey, header_no_mac: &[u8], expected: &[u8]) -> Result<()> {
    header_hmac(file_key, header_no_mac)?
        .verify_slice(expected)
        .map_err(|_| CryptoError::auth("invalid header HMAC"))
}

/// Derive the stream key from the file key and the payload nonce
pub fn payload_key(file_key: &FileKey, nonce: &[u8; PAYLOAD_NONCE_SIZE]) -> Result<DerivedKey> {
    hkdf_sha256(file_key.as_bytes(), Some(nonce.as_slice()), PAYLOAD_KEY_LABEL)
}

fn header_hmac(file_key: &FileKey, header_no_mac: &[u8]) -> Result<HmacSha256> {
    let hmac_key = hkdf_sha256(file_key.as_bytes(), None, HEADER_KEY_LABEL)?;
    let mut mac = <HmacSha256 as Mac>::new_from_slice(hmac_key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("HMAC init failed: {e}")))?;
    mac.update(header_no_mac);
    Ok(mac)
}
