//! STREAM payload encryption
//!
//! The payload is split into 64 KiB chunks, each sealed with
//! ChaCha20-Poly1305 under the stream key. The 12-byte chunk nonce is an
//! 11-byte big-endian counter followed by a flag byte that is `0x01` only on
//! the final chunk, so truncating or extending the stream is detected.
//!
//! ```text
//! [chunk 0: 65536 + 16][chunk 1: 65536 + 16]...[final: 0..=65536 + 16]
//! ```
//!
//! An empty plaintext still yields one (empty) final chunk, i.e. a bare tag.

use crate::{keys::DerivedKey, CryptoError, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use tracing::trace;
use zeroize::Zeroize;

/// Plaintext bytes per chunk (64 KiB)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Poly1305 tag size
pub const TAG_SIZE: usize = 16;

/// Sealed bytes per full chunk
pub const ENCRYPTED_CHUNK_SIZE: usize = CHUNK_SIZE + TAG_SIZE;

const NONCE_SIZE: usize = 12;
const COUNTER_SIZE: usize = NONCE_SIZE - 1;

/// Per-chunk nonce: 11-byte big-endian counter plus a last-chunk flag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamNonce {
    bytes: [u8; NONCE_SIZE],
}

impl StreamNonce {
    /// Nonce for the first chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the nonce bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }

    /// Set or clear the last-chunk flag
    pub fn set_last(&mut self, last: bool) {
        self.bytes[COUNTER_SIZE] = u8::from(last);
    }

    /// Whether the last-chunk flag is set
    pub fn is_last(&self) -> bool {
        self.bytes[COUNTER_SIZE] == 1
    }

    /// Advance the chunk counter
    pub fn increment(&mut self) -> Result<()> {
        for byte in self.bytes[..COUNTER_SIZE].iter_mut().rev() {
            if *byte == 255 {
                *byte = 0;
            } else {
                *byte += 1;
                return Ok(());
            }
        }
        Err(CryptoError::format("stream chunk counter overflow"))
    }
}

/// Chunked authenticated encryption of a payload under one stream key
pub struct Stream {
    cipher: ChaCha20Poly1305,
}

impl Stream {
    /// Create a stream cipher for the given (single-use) stream key
    pub fn new(key: &DerivedKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt an entire payload
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut ciphertext = Vec::with_capacity(Self::sealed_len(plaintext.len()));
        let mut nonce = StreamNonce::new();
        let mut offset = 0;

        loop {
            let remaining = plaintext.len() - offset;
            let last = remaining <= CHUNK_SIZE;
            let end = offset + remaining.min(CHUNK_SIZE);
            nonce.set_last(last);

            let sealed = self
                .cipher
                .encrypt(Nonce::from_slice(nonce.as_bytes()), &plaintext[offset..end])
                .map_err(|e| CryptoError::Encryption(format!("STREAM encryption failed: {e}")))?;
            ciphertext.extend_from_slice(&sealed);
            trace!(offset, len = end - offset, last, "sealed chunk");

            if last {
                return Ok(ciphertext);
            }
            offset = end;
            nonce.increment()?;
        }
    }

    /// Decrypt an entire payload; any failure discards all output
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let mut plaintext = Vec::with_capacity(ciphertext.len());
        match self.decrypt_into(ciphertext, &mut plaintext) {
            Ok(()) => Ok(plaintext),
            Err(e) => {
                plaintext.zeroize();
                Err(e)
            }
        }
    }

    fn decrypt_into(&self, ciphertext: &[u8], plaintext: &mut Vec<u8>) -> Result<()> {
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::format("ciphertext is too small"));
        }

        let mut nonce = StreamNonce::new();
        let mut offset = 0;
        let mut first = true;

        while offset < ciphertext.len() {
            let remaining = ciphertext.len() - offset;
            let last = remaining <= ENCRYPTED_CHUNK_SIZE;
            let end = offset + remaining.min(ENCRYPTED_CHUNK_SIZE);
            nonce.set_last(last);

            let mut chunk = self
                .cipher
                .decrypt(Nonce::from_slice(nonce.as_bytes()), &ciphertext[offset..end])
                .map_err(|_| CryptoError::auth("STREAM decryption failed"))?;

            // Only a wholly empty message may end in an empty chunk
            if last && !first && chunk.is_empty() {
                return Err(CryptoError::format("final chunk is empty"));
            }

            plaintext.extend_from_slice(&chunk);
            chunk.zeroize();
            trace!(offset, len = end - offset, last, "opened chunk");

            offset = end;
            first = false;
            if !last {
                nonce.increment()?;
            }
        }
        Ok(())
    }

    /// Ciphertext length for a plaintext of `plaintext_len` bytes
    ///
    /// Fails when the result does not fit in a `u64`.
    pub fn ciphertext_size(plaintext_len: u64) -> Result<u64> {
        let chunks = plaintext_len.div_ceil(CHUNK_SIZE as u64).max(1);
        (TAG_SIZE as u64)
            .checked_mul(chunks)
            .and_then(|tags| plaintext_len.checked_add(tags))
            .ok_or_else(|| CryptoError::format("plaintext is too large"))
    }

    /// Plaintext length for a ciphertext of `ciphertext_len` bytes
    ///
    /// Rejects lengths no encrypter could have produced, including a
    /// trailing segment that holds nothing but (part of) a tag.
    pub fn plaintext_size(ciphertext_len: u64) -> Result<u64> {
        let tag = TAG_SIZE as u64;
        if ciphertext_len < tag {
            return Err(CryptoError::format("ciphertext is too small"));
        }
        if ciphertext_len == tag {
            return Ok(0);
        }

        let full_chunks = ciphertext_len / ENCRYPTED_CHUNK_SIZE as u64;
        let last_chunk = ciphertext_len % ENCRYPTED_CHUNK_SIZE as u64;
        if last_chunk > 0 && last_chunk <= tag {
            return Err(CryptoError::format("ciphertext size is invalid"));
        }

        let partial = u64::from(last_chunk > 0);
        Ok(ciphertext_len - tag * (full_chunks + partial))
    }

    fn sealed_len(plaintext_len: usize) -> usize {
        plaintext_len + TAG_SIZE * plaintext_len.div_ceil(CHUNK_SIZE).max(1)
    }
}
