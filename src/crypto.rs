//! Correlation token generation using `ring`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CoinbaseError, Result};

/// Number of random bytes behind every attempt id.
pub const ATTEMPT_ID_BYTES: usize = 32;

/// Generate an unpredictable attempt id, base64url encoded without padding.
pub fn generate_attempt_id() -> Result<String> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; ATTEMPT_ID_BYTES];
    rng.fill(&mut buf)
        .map_err(|_| CoinbaseError::Unavailable("secure random source failed".into()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Compare two tokens without short-circuiting on the first differing byte.
pub fn tokens_match(expected: &str, received: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(expected.as_bytes(), received.as_bytes()).is_ok()
}
