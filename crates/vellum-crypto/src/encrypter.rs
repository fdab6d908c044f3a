//! File encryption
//!
//! An [`Encrypter`] is built once with an [`EncrypterBuilder`] and can then
//! encrypt any number of payloads. Each call draws a fresh file key and
//! payload nonce.
//!
//! ```text
//! age-encryption.org/v1
//! -> <stanza per recipient>
//! --- <base64(HMAC)>
//! <16-byte nonce><STREAM ciphertext>
//! ```

use crate::{
    armor,
    header::{Header, Stanza},
    keys::{FileKey, RECIPIENT_PREFIX},
    passphrase::{ScryptConfig, ScryptRecipient},
    recipient::{AnyRecipient, Recipient},
    stream::Stream,
    symmetric::{header_mac, payload_key, PAYLOAD_NONCE_SIZE},
    x25519::X25519Recipient,
    CryptoError, Result,
};
use rand::rngs::OsRng;
use tracing::{debug, instrument};

/// Who a file is encrypted to
#[derive(Debug)]
pub enum RecipientSet {
    /// One or more key recipients, wrapped in registration order
    Keys(Vec<AnyRecipient>),
    /// Exactly one passphrase, alone in the header
    Passphrase(ScryptRecipient),
}

impl RecipientSet {
    fn wrap(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        match self {
            Self::Keys(recipients) => {
                let mut stanzas = Vec::with_capacity(recipients.len());
                for recipient in recipients {
                    stanzas.extend(recipient.wrap_file_key(file_key)?);
                }
                Ok(stanzas)
            }
            Self::Passphrase(recipient) => recipient.wrap_file_key(file_key),
        }
    }
}

/// Builder for [`Encrypter`]
///
/// Mixing recipients with a passphrase, or setting a second passphrase, is
/// rejected by the call that introduces the conflict.
#[derive(Debug, Default)]
pub struct EncrypterBuilder {
    recipients: Option<RecipientSet>,
    scrypt: ScryptConfig,
}

impl EncrypterBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key recipient
    pub fn add_recipient(mut self, recipient: impl Into<AnyRecipient>) -> Result<Self> {
        match &mut self.recipients {
            None => self.recipients = Some(RecipientSet::Keys(vec![recipient.into()])),
            Some(RecipientSet::Keys(list)) => list.push(recipient.into()),
            Some(RecipientSet::Passphrase(_)) => {
                return Err(CryptoError::config(
                    "can't encrypt to both recipients and passphrases",
                ))
            }
        }
        Ok(self)
    }

    /// Add a recipient from its text form
    pub fn add_recipient_str(self, recipient: &str) -> Result<Self> {
        if !recipient.starts_with(RECIPIENT_PREFIX) {
            return Err(CryptoError::config("unrecognized recipient type"));
        }
        let recipient: X25519Recipient = recipient.parse()?;
        self.add_recipient(recipient)
    }

    /// Encrypt to a passphrase instead of key recipients
    pub fn set_passphrase(mut self, passphrase: impl Into<String>) -> Result<Self> {
        match self.recipients {
            None => {
                let recipient = ScryptRecipient::with_config(passphrase, self.scrypt.clone())?;
                self.recipients = Some(RecipientSet::Passphrase(recipient));
                Ok(self)
            }
            Some(RecipientSet::Keys(_)) => Err(CryptoError::config(
                "can't encrypt to both recipients and passphrases",
            )),
            Some(RecipientSet::Passphrase(_)) => Err(CryptoError::config(
                "can encrypt to at most one passphrase",
            )),
        }
    }

    /// Set log2(N) for the passphrase stanza
    pub fn with_work_factor(self, work_factor: u8) -> Result<Self> {
        self.with_scrypt_config(ScryptConfig { work_factor })
    }

    /// Set the passphrase settings
    pub fn with_scrypt_config(mut self, config: ScryptConfig) -> Result<Self> {
        config.validate()?;
        if let Some(RecipientSet::Passphrase(recipient)) = &mut self.recipients {
            recipient.set_config(config.clone())?;
        }
        self.scrypt = config;
        Ok(self)
    }

    /// Finish configuration
    pub fn build(self) -> Result<Encrypter> {
        let recipients = self
            .recipients
            .ok_or_else(|| CryptoError::config("no recipients or passphrase set"))?;
        Ok(Encrypter { recipients })
    }
}

/// Encrypts payloads to a fixed recipient set
#[derive(Debug)]
pub struct Encrypter {
    recipients: RecipientSet,
}

impl Encrypter {
    /// Start building an encrypter
    pub fn builder() -> EncrypterBuilder {
        EncrypterBuilder::new()
    }

    /// Encrypt to a single passphrase with default settings
    pub fn with_passphrase(passphrase: impl Into<String>) -> Result<Self> {
        EncrypterBuilder::new().set_passphrase(passphrase)?.build()
    }

    /// Encrypt to a list of key recipients
    pub fn with_recipients<I, R>(recipients: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<AnyRecipient>,
    {
        recipients
            .into_iter()
            .try_fold(EncrypterBuilder::new(), |builder, r| builder.add_recipient(r))?
            .build()
    }

    /// The configured recipients
    pub fn recipients(&self) -> &RecipientSet {
        &self.recipients
    }

    /// Encrypt `plaintext` into a complete file
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let file_key = FileKey::generate();

        let stanzas = self.recipients.wrap(&file_key)?;
        debug!(stanzas = stanzas.len(), "wrapped file key");

        let header_no_mac = Header::encode_without_mac(&stanzas)?;
        let mac = header_mac(&file_key, header_no_mac.as_bytes())?;
        let header = Header {
            stanzas,
            mac: mac.to_vec(),
        }
        .encode()?;

        let mut nonce = [0u8; PAYLOAD_NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut nonce);
        let payload = Stream::new(&payload_key(&file_key, &nonce)?).encrypt(plaintext)?;

        let mut out = Vec::with_capacity(header.len() + nonce.len() + payload.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&payload);
        debug!(header_len = header.len(), file_len = out.len(), "encrypted");
        Ok(out)
    }

    /// Encrypt `plaintext` into an ASCII-armored file
    pub fn encrypt_armored(&self, plaintext: &[u8]) -> Result<String> {
        Ok(armor::encode(&self.encrypt(plaintext)?))
    }
}
