//! scrypt passphrase stanza
//!
//! ```text
//! -> scrypt <base64(salt)> <log2(N)>
//! <base64(ChaCha20-Poly1305(wrap key, zero nonce, file key))>
//! ```
//!
//! The wrap key is `scrypt(passphrase, label || salt, N = 2^logN, r = 8, p = 1)`.
//! A passphrase stanza must be alone in its header.

use crate::{
    header::{b64_decode, b64_encode, Stanza},
    keys::{DerivedKey, FileKey},
    recipient::{Identity, Recipient},
    scrypt::{self, ScryptParams},
    symmetric::{open_file_key, seal_file_key},
    CryptoError, Result,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Stanza tag
pub const SCRYPT_TAG: &str = "scrypt";

/// Prefix of the scrypt salt
const SCRYPT_LABEL: &[u8] = b"age-encryption.org/v1/scrypt";

/// Size of the random per-stanza salt
pub const SALT_SIZE: usize = 16;

/// log2(N) used when encrypting, unless configured otherwise
pub const DEFAULT_WORK_FACTOR: u8 = 18;

/// Highest log2(N) a decrypter will accept
pub const MAX_WORK_FACTOR: u8 = 20;

const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Passphrase encryption settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryptConfig {
    /// log2 of the scrypt cost N
    pub work_factor: u8,
}

impl Default for ScryptConfig {
    fn default() -> Self {
        Self {
            work_factor: DEFAULT_WORK_FACTOR,
        }
    }
}

impl ScryptConfig {
    /// Reject work factors a decrypter would refuse
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WORK_FACTOR).contains(&self.work_factor) {
            return Err(CryptoError::config(format!(
                "scrypt work factor must be in 1..={MAX_WORK_FACTOR}, got {}",
                self.work_factor
            )));
        }
        Ok(())
    }
}

fn wrap_key(passphrase: &str, salt: &[u8; SALT_SIZE], log_n: u8) -> Result<DerivedKey> {
    let mut scrypt_salt = Vec::with_capacity(SCRYPT_LABEL.len() + SALT_SIZE);
    scrypt_salt.extend_from_slice(SCRYPT_LABEL);
    scrypt_salt.extend_from_slice(salt);

    let params = ScryptParams::from_log_n(log_n, SCRYPT_R, SCRYPT_P)?;
    scrypt::derive_key(passphrase.as_bytes(), &scrypt_salt, &params)
}

/// `^[1-9][0-9]*$`
fn is_canonical_decimal(s: &str) -> bool {
    let bytes = s.as_bytes();
    matches!(bytes.first(), Some(b'1'..=b'9')) && bytes.iter().all(u8::is_ascii_digit)
}

/// Encrypts to a passphrase
#[derive(Clone)]
pub struct ScryptRecipient {
    passphrase: Zeroizing<String>,
    config: ScryptConfig,
}

impl ScryptRecipient {
    /// Create a recipient with the default work factor
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            config: ScryptConfig::default(),
        }
    }

    /// Create a recipient with explicit settings
    pub fn with_config(passphrase: impl Into<String>, config: ScryptConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            passphrase: Zeroizing::new(passphrase.into()),
            config,
        })
    }

    /// log2(N) this recipient encrypts with
    pub fn work_factor(&self) -> u8 {
        self.config.work_factor
    }

    pub(crate) fn set_config(&mut self, config: ScryptConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

impl Recipient for ScryptRecipient {
    fn wrap_file_key(&self, file_key: &FileKey) -> Result<Vec<Stanza>> {
        let mut salt = [0u8; SALT_SIZE];
        rand::RngCore::fill_bytes(&mut OsRng, &mut salt);

        let key = wrap_key(&self.passphrase, &salt, self.config.work_factor)?;
        let body = seal_file_key(&key, file_key)?;

        Ok(vec![Stanza::new(
            [
                SCRYPT_TAG.to_string(),
                b64_encode(&salt),
                self.config.work_factor.to_string(),
            ],
            body,
        )])
    }
}

impl fmt::Debug for ScryptRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScryptRecipient")
            .field("work_factor", &self.config.work_factor)
            .finish_non_exhaustive()
    }
}

/// Decrypts with a passphrase
#[derive(Clone)]
pub struct ScryptIdentity {
    passphrase: Zeroizing<String>,
    max_work_factor: u8,
}

impl ScryptIdentity {
    /// Create an identity accepting work factors up to [`MAX_WORK_FACTOR`]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            max_work_factor: MAX_WORK_FACTOR,
        }
    }

    /// Lower the highest accepted work factor; values above
    /// [`MAX_WORK_FACTOR`] are clamped to it
    pub fn with_max_work_factor(mut self, max_work_factor: u8) -> Self {
        self.max_work_factor = max_work_factor.min(MAX_WORK_FACTOR);
        self
    }

    /// Highest log2(N) this identity will run
    pub fn max_work_factor(&self) -> u8 {
        self.max_work_factor
    }

    fn unwrap_stanza(&self, stanza: &Stanza) -> Result<Option<FileKey>> {
        if stanza.args.len() != 3 || !is_canonical_decimal(&stanza.args[2]) {
            return Err(CryptoError::format("invalid scrypt stanza"));
        }
        let salt: [u8; SALT_SIZE] = b64_decode(&stanza.args[1])?
            .try_into()
            .map_err(|_| CryptoError::format("invalid scrypt stanza"))?;

        let log_n = stanza.args[2]
            .parse::<u8>()
            .ok()
            .filter(|n| *n <= self.max_work_factor)
            .ok_or_else(|| CryptoError::Parameter("scrypt work factor is too high".to_string()))?;

        debug!(work_factor = log_n, "deriving passphrase wrap key");
        let key = wrap_key(&self.passphrase, &salt, log_n)?;
        open_file_key(&key, &stanza.body)
    }
}

impl Identity for ScryptIdentity {
    fn unwrap_file_key(&self, stanzas: &[Stanza]) -> Result<Option<FileKey>> {
        for stanza in stanzas {
            if stanza.tag() != Some(SCRYPT_TAG) {
                continue;
            }
            if stanzas.len() != 1 {
                return Err(CryptoError::format(
                    "scrypt recipient is not the only one in the header",
                ));
            }
            if let Some(file_key) = self.unwrap_stanza(stanza)? {
                return Ok(Some(file_key));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for ScryptIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScryptIdentity")
            .field("max_work_factor", &self.max_work_factor)
            .finish_non_exhaustive()
    }
}
