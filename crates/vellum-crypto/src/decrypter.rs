//! File decryption
//!
//! Identities are tried in registration order; the first one that unwraps
//! the file key wins. The header MAC is verified before any payload byte is
//! touched.

use crate::{
    armor,
    header::{Header, ParsedHeader, Stanza},
    keys::{FileKey, IDENTITY_PREFIX},
    passphrase::ScryptIdentity,
    recipient::{AnyIdentity, Identity},
    stream::Stream,
    symmetric::{payload_key, verify_header_mac, PAYLOAD_NONCE_SIZE},
    x25519::X25519Identity,
    CryptoError, Result,
};
use tracing::{debug, instrument, warn};

/// Decrypts files with an ordered list of identities
#[derive(Debug, Default)]
pub struct Decrypter {
    identities: Vec<AnyIdentity>,
}

impl Decrypter {
    /// Create a decrypter with no identities
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity
    pub fn add_identity(&mut self, identity: impl Into<AnyIdentity>) -> &mut Self {
        self.identities.push(identity.into());
        self
    }

    /// Register an identity from its text form
    pub fn add_identity_str(&mut self, identity: &str) -> Result<&mut Self> {
        if !identity.starts_with(IDENTITY_PREFIX) {
            return Err(CryptoError::config("unrecognized identity type"));
        }
        let identity: X25519Identity = identity.parse()?;
        Ok(self.add_identity(identity))
    }

    /// Register a passphrase
    pub fn add_passphrase(&mut self, passphrase: impl Into<String>) -> &mut Self {
        self.add_identity(ScryptIdentity::new(passphrase))
    }

    /// Registered identities, in the order they are tried
    pub fn identities(&self) -> &[AnyIdentity] {
        &self.identities
    }

    /// Decrypt a complete file, binary or armored
    #[instrument(skip_all, fields(file_len = file.len(), identities = self.identities.len()))]
    pub fn decrypt(&self, file: &[u8]) -> Result<Vec<u8>> {
        if armor::is_armored(file) {
            let text = std::str::from_utf8(file)
                .map_err(|_| CryptoError::format("armored file is not valid UTF-8"))?;
            debug!("decoding armor");
            return self.decrypt_binary(&armor::decode(text)?);
        }
        self.decrypt_binary(file)
    }

    fn decrypt_binary(&self, file: &[u8]) -> Result<Vec<u8>> {
        let parsed = Header::parse(file)?;
        let file_key = self.unwrap_verified(&parsed)?;

        let (nonce, payload) = parsed
            .rest
            .split_first_chunk::<PAYLOAD_NONCE_SIZE>()
            .ok_or_else(|| CryptoError::format("missing nonce"))?;

        let plaintext = Stream::new(&payload_key(&file_key, nonce)?).decrypt(payload)?;
        debug!(plaintext_len = plaintext.len(), "decrypted");
        Ok(plaintext)
    }

    /// Recover the file key from a header alone
    ///
    /// Bytes after the MAC line are ignored.
    #[instrument(skip_all, fields(header_len = header.len(), identities = self.identities.len()))]
    pub fn decrypt_header(&self, header: &[u8]) -> Result<FileKey> {
        let parsed = Header::parse(header)?;
        self.unwrap_verified(&parsed)
    }

    fn unwrap_verified(&self, parsed: &ParsedHeader<'_>) -> Result<FileKey> {
        let stanzas = &parsed.header.stanzas;
        debug!(stanzas = stanzas.len(), "parsed header");

        let file_key = self.unwrap_file_key(stanzas)?;

        verify_header_mac(&file_key, parsed.header_no_mac, &parsed.header.mac).inspect_err(|_| {
            warn!("header MAC verification failed");
        })?;
        Ok(file_key)
    }

    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<FileKey> {
        for (index, identity) in self.identities.iter().enumerate() {
            if let Some(file_key) = identity.unwrap_file_key(stanzas)? {
                debug!(identity = index, "identity matched");
                return Ok(file_key);
            }
        }
        Err(CryptoError::NoMatch)
    }
}
