//! scrypt password-based key derivation (RFC 7914)
//!
//! Built directly from PBKDF2-HMAC-SHA256 and the Salsa20/8 core so the
//! passphrase recipient does not depend on a platform scrypt:
//!
//! ```text
//! B        = PBKDF2(password, salt, 1, p * 128r)
//! B[i]     = ROMix(B[i], N)            for each of the p blocks
//! output   = PBKDF2(password, B, 1, dkLen)
//! ```
//!
//! ROMix keeps all N intermediate BlockMix states in one contiguous arena
//! of `N * 128r` bytes, allocated once per derivation and reused across the
//! p blocks.

use crate::{
    keys::{DerivedKey, KEY_SIZE},
    CryptoError, Result,
};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroize;

/// Bytes in one Salsa20 block
const SALSA_BLOCK: usize = 64;

/// 32-bit words in one Salsa20 block
const SALSA_WORDS: usize = SALSA_BLOCK / 4;

/// scrypt cost parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScryptParams {
    n: u64,
    r: u32,
    p: u32,
}

impl ScryptParams {
    /// Validate cost parameters: `n` must be a power of two greater than one
    pub fn new(n: u64, r: u32, p: u32) -> Result<Self> {
        if n < 2 || !n.is_power_of_two() {
            return Err(CryptoError::Parameter(
                "N must be a power of 2 greater than 1".to_string(),
            ));
        }
        if r == 0 || p == 0 {
            return Err(CryptoError::Parameter("r and p must be positive".to_string()));
        }
        if u64::from(r) * u64::from(p) >= 1 << 30 {
            return Err(CryptoError::Parameter("r * p must be below 2^30".to_string()));
        }
        Ok(Self { n, r, p })
    }

    /// Parameters with `N = 2^log_n`
    pub fn from_log_n(log_n: u8, r: u32, p: u32) -> Result<Self> {
        if !(1..64).contains(&log_n) {
            return Err(CryptoError::Parameter(format!(
                "log2(N) must be in 1..64, got {log_n}"
            )));
        }
        Self::new(1u64 << log_n, r, p)
    }

    /// CPU/memory cost N
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Block size r
    pub fn r(&self) -> u32 {
        self.r
    }

    /// Parallelization p
    pub fn p(&self) -> u32 {
        self.p
    }

    /// Bytes of scratch memory one derivation needs (`N * 128r`)
    pub fn memory_bytes(&self) -> Option<u64> {
        self.n.checked_mul(128 * u64::from(self.r))
    }
}

/// Derive `output.len()` bytes from a password and salt
pub fn derive(
    password: &[u8],
    salt: &[u8],
    params: &ScryptParams,
    output: &mut [u8],
) -> Result<()> {
    let too_large =
        || CryptoError::Parameter("scrypt parameters exceed addressable memory".to_string());

    let r = params.r as usize;
    let n = usize::try_from(params.n).map_err(|_| too_large())?;
    let block_len = r.checked_mul(128).ok_or_else(too_large)?;
    let block_words = block_len / 4;
    let arena_words = n.checked_mul(block_words).ok_or_else(too_large)?;
    let b_len = (params.p as usize)
        .checked_mul(block_len)
        .ok_or_else(too_large)?;

    debug!(n = params.n, r = params.r, p = params.p, "deriving scrypt key");

    let mut b = vec![0u8; b_len];
    pbkdf2_hmac::<Sha256>(password, salt, 1, &mut b);

    let mut arena = vec![0u32; arena_words];
    let mut x = vec![0u32; block_words];
    let mut y = vec![0u32; block_words];
    for block in b.chunks_exact_mut(block_len) {
        ro_mix(block, n, &mut arena, &mut x, &mut y);
    }

    pbkdf2_hmac::<Sha256>(password, &b, 1, output);

    b.zeroize();
    arena.zeroize();
    x.zeroize();
    y.zeroize();
    Ok(())
}

/// Derive a 32-byte key
pub fn derive_key(password: &[u8], salt: &[u8], params: &ScryptParams) -> Result<DerivedKey> {
    let mut key = [0u8; KEY_SIZE];
    derive(password, salt, params, &mut key)?;
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    Ok(derived)
}

/// ROMix: fill the arena with N BlockMix states, then walk it pseudo-randomly
fn ro_mix<'a>(
    block: &mut [u8],
    n: usize,
    arena: &mut [u32],
    xs: &'a mut [u32],
    ys: &'a mut [u32],
) {
    let words = xs.len();

    for (w, bytes) in xs.iter_mut().zip(block.chunks_exact(4)) {
        *w = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let (mut x, mut y) = (xs, ys);
    for state in arena.chunks_exact_mut(words) {
        state.copy_from_slice(x);
        block_mix(x, y);
        std::mem::swap(&mut x, &mut y);
    }

    for _ in 0..n {
        let j = integerify(x) & (n as u64 - 1);
        let offset = j as usize * words;
        for (a, v) in x.iter_mut().zip(&arena[offset..offset + words]) {
            *a ^= v;
        }
        block_mix(x, y);
        std::mem::swap(&mut x, &mut y);
    }

    for (bytes, w) in block.chunks_exact_mut(4).zip(x.iter()) {
        bytes.copy_from_slice(&w.to_le_bytes());
    }
}

/// The first 64 bits of the last Salsa block, little-endian
fn integerify(x: &[u32]) -> u64 {
    let last = x.len() - SALSA_WORDS;
    u64::from(x[last]) | (u64::from(x[last + 1]) << 32)
}

/// BlockMix over 2r Salsa blocks, de-interleaving even then odd outputs
fn block_mix(input: &[u32], output: &mut [u32]) {
    let r = input.len() / (2 * SALSA_WORDS);

    let mut t = [0u32; SALSA_WORDS];
    t.copy_from_slice(&input[input.len() - SALSA_WORDS..]);

    for (i, chunk) in input.chunks_exact(SALSA_WORDS).enumerate() {
        for (a, b) in t.iter_mut().zip(chunk) {
            *a ^= b;
        }
        salsa20_8(&mut t);

        let dst = (i / 2 + (i % 2) * r) * SALSA_WORDS;
        output[dst..dst + SALSA_WORDS].copy_from_slice(&t);
    }
}

/// Salsa20/8 core: four double rounds, then feed-forward of the input
fn salsa20_8(block: &mut [u32; SALSA_WORDS]) {
    let mut x = *block;

    for _ in 0..4 {
        // columns
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 5, 9, 13, 1);
        quarter_round(&mut x, 10, 14, 2, 6);
        quarter_round(&mut x, 15, 3, 7, 11);
        // rows
        quarter_round(&mut x, 0, 1, 2, 3);
        quarter_round(&mut x, 5, 6, 7, 4);
        quarter_round(&mut x, 10, 11, 8, 9);
        quarter_round(&mut x, 15, 12, 13, 14);
    }

    for (out, mixed) in block.iter_mut().zip(x) {
        *out = out.wrapping_add(mixed);
    }
}

#[inline(always)]
fn quarter_round(x: &mut [u32; SALSA_WORDS], a: usize, b: usize, c: usize, d: usize) {
    x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
    x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
    x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
    x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
}
