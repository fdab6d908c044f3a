//! ASCII armor
//!
//! A strict PEM subset for carrying an encrypted file through text channels:
//!
//! ```text
//! -----BEGIN AGE ENCRYPTED FILE-----
//! <padded base64, 64 columns per line>
//! -----END AGE ENCRYPTED FILE-----
//! ```
//!
//! Every line but the last must be exactly 64 columns. CRLF line endings and
//! surrounding whitespace are tolerated on input.

use crate::{CryptoError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// First line of an armored file
pub const ARMOR_HEADER: &str = "-----BEGIN AGE ENCRYPTED FILE-----";

/// Last line of an armored file
pub const ARMOR_FOOTER: &str = "-----END AGE ENCRYPTED FILE-----";

/// Encoded columns per base64 line
pub const ARMOR_COLUMNS: usize = 64;

/// Decoded bytes per base64 line
const BYTES_PER_LINE: usize = ARMOR_COLUMNS / 4 * 3;

/// Whether `data` starts like an armored file
pub fn is_armored(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(ARMOR_HEADER.as_bytes())
}

/// Wrap binary data in armor
pub fn encode(data: &[u8]) -> String {
    let lines = data.len().div_ceil(BYTES_PER_LINE);
    let mut out = String::with_capacity(
        ARMOR_HEADER.len() + ARMOR_FOOTER.len() + lines * (ARMOR_COLUMNS + 1) + 2,
    );

    out.push_str(ARMOR_HEADER);
    out.push('\n');
    for chunk in data.chunks(BYTES_PER_LINE) {
        STANDARD.encode_string(chunk, &mut out);
        out.push('\n');
    }
    out.push_str(ARMOR_FOOTER);
    out.push('\n');
    out
}

/// Unwrap armored text back into binary data
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let text = text.replace("\r\n", "\n");
    let mut lines: Vec<&str> = text.trim_matches(is_armor_space).split('\n').collect();

    if lines.first() != Some(&ARMOR_HEADER) {
        return Err(CryptoError::format("invalid armor header"));
    }
    lines.remove(0);
    if lines.pop() != Some(ARMOR_FOOTER) {
        return Err(CryptoError::format("invalid armor footer"));
    }

    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let valid_len = if i == last {
            !line.is_empty() && line.len() <= ARMOR_COLUMNS && line.len() % 4 == 0
        } else {
            line.len() == ARMOR_COLUMNS
        };
        if !valid_len {
            return Err(CryptoError::format("invalid armor line length"));
        }
        if !line
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        {
            return Err(CryptoError::format("invalid armor base64"));
        }
    }

    STANDARD
        .decode(lines.concat())
        .map_err(|e| CryptoError::format(format!("invalid armor base64: {e}")))
}

fn is_armor_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0b')
}
