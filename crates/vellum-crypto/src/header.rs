//! age v1 header codec
//!
//! ```text
//! age-encryption.org/v1
//! -> X25519 <base64 ephemeral share>
//! <base64 body, 48 decoded bytes per line>
//! --- <base64 HMAC-SHA256>
//! <16-byte stream nonce><payload>
//! ```
//!
//! All base64 in the header is unpadded and canonical: a string is only
//! accepted if re-encoding its decoded bytes reproduces it exactly, so every
//! header has a single byte representation and the MAC stays verifiable.

use crate::{CryptoError, Result};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};

/// The version line every header starts with
pub const VERSION_LINE: &str = "age-encryption.org/v1";

/// Prefix of a stanza argument line
pub const STANZA_PREFIX: &str = "-> ";

/// Prefix of the MAC line
pub const MAC_PREFIX: &str = "---";

/// Maximum number of decoded body bytes per line
pub const BODY_LINE_SIZE: usize = 48;

/// Encode bytes as unpadded standard base64
pub fn b64_encode(data: &[u8]) -> String {
    STANDARD_NO_PAD.encode(data)
}

/// Decode unpadded standard base64, rejecting padding and non-canonical input
pub fn b64_decode(s: &str) -> Result<Vec<u8>> {
    if s.contains('=') {
        return Err(CryptoError::format("invalid base64: padding not allowed"));
    }
    let decoded = STANDARD_NO_PAD
        .decode(s)
        .map_err(|e| CryptoError::format(format!("invalid base64: {e}")))?;
    if STANDARD_NO_PAD.encode(&decoded) != s {
        return Err(CryptoError::format("non-canonical base64"));
    }
    Ok(decoded)
}

/// One recipient's wrapped copy of the file key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stanza {
    /// Arguments; the first names the wrapping scheme
    pub args: Vec<String>,
    /// Opaque binary body
    pub body: Vec<u8>,
}

impl Stanza {
    /// Create a stanza from its arguments and body
    pub fn new<I, S>(args: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            body,
        }
    }

    /// The scheme tag (first argument), if any
    pub fn tag(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    fn validate(&self) -> Result<()> {
        if self.args.is_empty() {
            return Err(CryptoError::format("stanza has no arguments"));
        }
        for arg in &self.args {
            if arg.is_empty() || !arg.bytes().all(|b| (0x21..=0x7e).contains(&b)) {
                return Err(CryptoError::format(format!(
                    "invalid stanza argument {arg:?}"
                )));
            }
        }
        Ok(())
    }
}

/// A complete header: stanzas plus the MAC over their encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Recipient stanzas, in file order
    pub stanzas: Vec<Stanza>,
    /// HMAC-SHA256 over the header up to and including `---`
    pub mac: Vec<u8>,
}

/// Result of parsing a header out of a larger buffer
#[derive(Debug)]
pub struct ParsedHeader<'a> {
    /// The decoded header
    pub header: Header,
    /// Header bytes from the version line through `---`, the MAC input
    pub header_no_mac: &'a [u8],
    /// Everything following the MAC line
    pub rest: &'a [u8],
}

impl ParsedHeader<'_> {
    /// Number of bytes the header occupied in the input
    pub fn header_len(&self) -> usize {
        self.header_no_mac.len() + self.mac_line_len()
    }

    fn mac_line_len(&self) -> usize {
        // " " + base64(mac) + "\n"
        1 + b64_encode(&self.header.mac).len() + 1
    }
}

impl Header {
    /// Parse a header from the start of `data`
    pub fn parse(data: &[u8]) -> Result<ParsedHeader<'_>> {
        let mut lines = LineReader::new(data);

        let version = lines.next_line()?;
        if version != VERSION_LINE {
            return Err(CryptoError::format(format!("invalid version {version:?}")));
        }

        let mut stanzas = Vec::new();
        loop {
            let line_start = lines.pos;
            let line = lines.next_line()?;

            if let Some(mac_b64) = line
                .strip_prefix(MAC_PREFIX)
                .and_then(|s| s.strip_prefix(' '))
            {
                let mac = b64_decode(mac_b64)?;
                let header_no_mac = &data[..line_start + MAC_PREFIX.len()];
                return Ok(ParsedHeader {
                    header: Header { stanzas, mac },
                    header_no_mac,
                    rest: &data[lines.pos..],
                });
            }

            let args_line = line
                .strip_prefix(STANZA_PREFIX)
                .ok_or_else(|| CryptoError::format("invalid stanza"))?;
            let args: Vec<String> = args_line.split(' ').map(str::to_string).collect();
            if args.iter().any(String::is_empty) {
                return Err(CryptoError::format("invalid stanza: empty argument"));
            }

            let mut body = Vec::new();
            loop {
                let decoded = b64_decode(lines.next_line()?)?;
                if decoded.len() > BODY_LINE_SIZE {
                    return Err(CryptoError::format("invalid stanza: body line too long"));
                }
                body.extend_from_slice(&decoded);
                if decoded.len() < BODY_LINE_SIZE {
                    break;
                }
            }
            stanzas.push(Stanza { args, body });
        }
    }

    /// Encode the stanzas up to and including `---`, the exact MAC input
    pub fn encode_without_mac(stanzas: &[Stanza]) -> Result<String> {
        let mut out = String::with_capacity(64 + stanzas.len() * 128);
        out.push_str(VERSION_LINE);
        out.push('\n');

        for stanza in stanzas {
            stanza.validate()?;
            out.push_str(STANZA_PREFIX);
            out.push_str(&stanza.args.join(" "));
            out.push('\n');
            for chunk in stanza.body.chunks(BODY_LINE_SIZE) {
                out.push_str(&b64_encode(chunk));
                out.push('\n');
            }
            // A full final line needs an explicit empty terminator
            if stanza.body.len() % BODY_LINE_SIZE == 0 {
                out.push('\n');
            }
        }

        out.push_str(MAC_PREFIX);
        Ok(out)
    }

    /// Encode the complete header including the MAC line
    pub fn encode(&self) -> Result<String> {
        let mut out = Self::encode_without_mac(&self.stanzas)?;
        out.push(' ');
        out.push_str(&b64_encode(&self.mac));
        out.push('\n');
        Ok(out)
    }
}

/// Reads `\n`-terminated, printable-ASCII lines
struct LineReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_line(&mut self) -> Result<&'a str> {
        let remaining = &self.data[self.pos..];
        let end = remaining
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| CryptoError::format("unexpected end of header"))?;
        let line = &remaining[..end];

        if let Some(bad) = line.iter().find(|b| !(0x20..=0x7e).contains(*b)) {
            return Err(CryptoError::format(format!(
                "invalid non-ASCII byte {bad:#04x} in header"
            )));
        }
        self.pos += end + 1;

        std::str::from_utf8(line).map_err(|e| CryptoError::format(e.to_string()))
    }
}
