//! Bid creation.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_crypto::{commit_opening, random_secret, verify_opening};
use auction_types::{Amount, BidOpening, Commitment, Secret};

/// Errors that can occur during bid creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error("Deposit {deposit} does not cover bid value {value}")]
    InsufficientDeposit { value: Amount, deposit: Amount },

    #[error("Bid value not set")]
    MissingValue,
}

/// A prepared bid ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedBid {
    /// Commitment to publish with the bid
    pub commitment: Commitment,
    /// Opening to disclose at reveal (keep secret until then)
    pub opening: BidOpening,
    /// Deposit to attach
    pub deposit: Amount,
}

impl PreparedBid {
    /// Check the opening still matches the commitment.
    pub fn is_consistent(&self) -> bool {
        verify_opening(&self.commitment, &self.opening)
    }

    /// Whether this bid can win when revealed.
    pub fn is_binding(&self) -> bool {
        !self.opening.fake && self.deposit >= self.opening.value
    }
}

fn prepare(value: Amount, fake: bool, secret: Secret, deposit: Amount) -> PreparedBid {
    let opening = BidOpening {
        value,
        fake,
        secret,
    };
    PreparedBid {
        commitment: commit_opening(&opening),
        opening,
        deposit,
    }
}

/// Create a genuine bid with a fresh random secret.
///
/// The deposit must cover the value, otherwise the bid would be refunded at
/// reveal instead of competing.
pub fn create_bid<R: RngCore + CryptoRng>(
    value: Amount,
    deposit: Amount,
    rng: &mut R,
) -> Result<PreparedBid, BidError> {
    if deposit < value {
        return Err(BidError::InsufficientDeposit { value, deposit });
    }
    Ok(prepare(value, false, random_secret(rng), deposit))
}

/// Create a decoy bid. Its deposit is refunded in full at reveal.
pub fn create_fake_bid<R: RngCore + CryptoRng>(deposit: Amount, rng: &mut R) -> PreparedBid {
    prepare(0, true, random_secret(rng), deposit)
}

/// Builder for creating bids with additional options.
#[derive(Debug, Default)]
pub struct BidBuilder {
    value: Option<Amount>,
    deposit: Option<Amount>,
    fake: bool,
    secret: Option<Secret>,
}

impl BidBuilder {
    /// Create a new bid builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bid value.
    pub fn value(mut self, value: Amount) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the deposit. Defaults to the bid value.
    pub fn deposit(mut self, deposit: Amount) -> Self {
        self.deposit = Some(deposit);
        self
    }

    /// Mark the bid as a decoy.
    pub fn fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    /// Use a fixed secret instead of a random one.
    pub fn secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Build the prepared bid.
    pub fn build<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<PreparedBid, BidError> {
        let value = match (self.value, self.fake) {
            (Some(value), _) => value,
            (None, true) => 0,
            (None, false) => return Err(BidError::MissingValue),
        };
        let deposit = self.deposit.unwrap_or(value);

        if !self.fake && deposit < value {
            return Err(BidError::InsufficientDeposit { value, deposit });
        }

        let secret = self.secret.unwrap_or_else(|| random_secret(rng));
        Ok(prepare(value, self.fake, secret, deposit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::{commit, secret_from_label};
    use rand::rngs::OsRng;

    #[test]
    fn test_create_bid() {
        let mut rng = OsRng;
        let bid = create_bid(100, 120, &mut rng).unwrap();

        assert!(bid.is_consistent());
        assert!(bid.is_binding());
        assert_eq!(bid.opening.value, 100);
        assert_eq!(bid.deposit, 120);
    }

    #[test]
    fn test_create_bid_underfunded() {
        let mut rng = OsRng;
        assert_eq!(
            create_bid(100, 99, &mut rng),
            Err(BidError::InsufficientDeposit {
                value: 100,
                deposit: 99
            })
        );
    }

    #[test]
    fn test_fake_bid_not_binding() {
        let mut rng = OsRng;
        let bid = create_fake_bid(50, &mut rng);
        assert!(bid.opening.fake);
        assert!(bid.is_consistent());
        assert!(!bid.is_binding());
    }

    #[test]
    fn test_secrets_differ() {
        let mut rng = OsRng;
        let a = create_bid(10, 10, &mut rng).unwrap();
        let b = create_bid(10, 10, &mut rng).unwrap();
        assert_ne!(a.commitment, b.commitment);
    }

    #[test]
    fn test_builder_with_fixed_secret() {
        let mut rng = OsRng;
        let secret = secret_from_label("secret").unwrap();
        let bid = BidBuilder::new()
            .value(100)
            .secret(secret)
            .build(&mut rng)
            .unwrap();

        assert_eq!(bid.deposit, 100);
        assert_eq!(bid.commitment, commit(100, false, &secret));
    }

    #[test]
    fn test_builder_requires_value() {
        let mut rng = OsRng;
        assert_eq!(BidBuilder::new().build(&mut rng), Err(BidError::MissingValue));

        let decoy = BidBuilder::new().fake(true).deposit(5).build(&mut rng).unwrap();
        assert_eq!(decoy.opening.value, 0);
        assert_eq!(decoy.deposit, 5);
    }
}
