//! Hash commitments binding a bid value, a decoy flag and a secret.
//!
//! A commitment C = Keccak256(value || fake || secret) is:
//! - **Hiding**: Given C, cannot determine value or fake without the secret
//! - **Binding**: Cannot find a different opening with the same C
//!
//! Each field is encoded as a 32-byte word (the Ethereum ABI encoding of
//! `(uint256, bool, bytes32)`), so there is no delimiter ambiguity and
//! commitments match `keccak256(abi.encode(value, fake, secret))`.

use sha3::{Digest, Keccak256};

use auction_types::{Amount, BidOpening, Commitment, Secret, HASH_LEN};

/// Length of the canonical preimage: three 32-byte words.
pub const PREIMAGE_LEN: usize = 3 * HASH_LEN;

/// Encode `(value, fake, secret)` into the canonical preimage.
pub fn encode_preimage(value: Amount, fake: bool, secret: &Secret) -> [u8; PREIMAGE_LEN] {
    let mut out = [0u8; PREIMAGE_LEN];

    // uint256: big-endian, left-padded
    out[HASH_LEN - 8..HASH_LEN].copy_from_slice(&value.to_be_bytes());
    // bool: 0 or 1 in the last byte of its word
    out[2 * HASH_LEN - 1] = fake as u8;
    // bytes32: as-is
    out[2 * HASH_LEN..].copy_from_slice(&secret.0);

    out
}

/// Create a commitment to a bid.
pub fn commit(value: Amount, fake: bool, secret: &Secret) -> Commitment {
    let mut hasher = Keccak256::new();
    hasher.update(encode_preimage(value, fake, secret));
    Commitment(hasher.finalize().into())
}

/// Verify that `commitment` opens to the given values.
pub fn verify(commitment: &Commitment, value: Amount, fake: bool, secret: &Secret) -> bool {
    commit(value, fake, secret) == *commitment
}

/// Create a commitment from a full opening.
pub fn commit_opening(opening: &BidOpening) -> Commitment {
    commit(opening.value, opening.fake, &opening.secret)
}

/// Verify a commitment against a full opening.
pub fn verify_opening(commitment: &Commitment, opening: &BidOpening) -> bool {
    verify(commitment, opening.value, opening.fake, &opening.secret)
}
