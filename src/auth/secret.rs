//! Random capability generation: temporary audit links and invite secrets

use rand::distributions::Alphanumeric;
use rand::{rngs::OsRng, Rng};

/// Secret generator
pub struct SecretGenerator;

impl SecretGenerator {
    /// Generate a temporary public link token
    /// Format: tl_<43-char-random>
    pub fn temporary_link() -> String {
        format!("tl_{}", Self::random(43))
    }

    /// Generate a throwaway secret for an invited account.
    /// Nobody is told this value; the account must go through a reset flow.
    pub fn temporary_secret() -> String {
        Self::random(48)
    }

    fn random(len: usize) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}
