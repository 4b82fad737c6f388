//! Bid secrets and hex encodings.

use rand::{CryptoRng, RngCore};

use auction_types::{Commitment, Secret, HASH_LEN};

use crate::error::CryptoError;

/// Generate a fresh random secret.
pub fn random_secret<R: RngCore + CryptoRng>(rng: &mut R) -> Secret {
    let mut bytes = [0u8; HASH_LEN];
    rng.fill_bytes(&mut bytes);
    Secret(bytes)
}

/// Build a secret from a short UTF-8 label.
///
/// The label is right-padded with zeros, matching `encodeBytes32String` in
/// ethers. One byte is reserved for the terminating zero, so labels are limited
/// to 31 bytes.
pub fn secret_from_label(label: &str) -> Result<Secret, CryptoError> {
    let bytes = label.as_bytes();
    if bytes.len() >= HASH_LEN {
        return Err(CryptoError::LabelTooLong {
            max: HASH_LEN - 1,
            got: bytes.len(),
        });
    }

    let mut out = [0u8; HASH_LEN];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(Secret(out))
}

/// Parse a 32-byte secret from hex (optional `0x` prefix).
pub fn parse_secret(s: &str) -> Result<Secret, CryptoError> {
    parse_word(s).map(Secret)
}

/// Parse a 32-byte commitment from hex (optional `0x` prefix).
pub fn parse_commitment(s: &str) -> Result<Commitment, CryptoError> {
    parse_word(s).map(Commitment)
}

/// Parse a 32-byte address from hex (optional `0x` prefix).
pub fn parse_address(s: &str) -> Result<[u8; HASH_LEN], CryptoError> {
    parse_word(s)
}

fn parse_word(s: &str) -> Result<[u8; HASH_LEN], CryptoError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidLength {
            expected: HASH_LEN,
            got: len,
        })
}
