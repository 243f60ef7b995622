//! PKCE (S256) verifier/challenge pairs and opaque `state` values.

use crate::identity::error::{IdentityError, IdentityResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

pub const CHALLENGE_METHOD: &str = "S256";

#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Generates a 43-character verifier and its S256 challenge.
pub fn generate_pkce() -> IdentityResult<PkcePair> {
    let verifier = random_token(VERIFIER_BYTES)?;
    Ok(PkcePair {
        challenge: challenge_for(&verifier),
        verifier,
    })
}

/// `BASE64URL(SHA256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random URL-safe `state` value.
pub fn random_state() -> IdentityResult<String> {
    random_token(STATE_BYTES)
}

fn random_token(len: usize) -> IdentityResult<String> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| IdentityError::Entropy(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::{challenge_for, generate_pkce, random_state};

    #[test]
    fn challenge_matches_rfc7636_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_pairs_are_consistent_and_unique() {
        let first = generate_pkce().unwrap();
        let second = generate_pkce().unwrap();
        assert_eq!(first.verifier.len(), 43);
        assert_eq!(first.challenge, challenge_for(&first.verifier));
        assert_ne!(first.verifier, second.verifier);
        assert_ne!(random_state().unwrap(), random_state().unwrap());
    }
}
