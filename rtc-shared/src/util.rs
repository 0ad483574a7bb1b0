use crate::error::{Error, Result};
use rand::{Rng, rng};

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// math_rand_alpha generates a mathematical random alphabet sequence of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA)
}

/// generate_crypto_random_string picks `n` characters from `runes` using the thread-local CSPRNG.
pub fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rng();

    let rand_string: String = (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect();

    rand_string
}

/// parse_port parses a decimal port number.
///
/// The whole string must be a number: an empty string, trailing garbage
/// and anything outside `0..=65535` (negative values included) are rejected.
pub fn parse_port(s: &str) -> Result<u16> {
    let number: i64 = s.parse().map_err(|_| Error::ErrInvalidPortNumber)?;
    if number < 0 || number > u16::MAX as i64 {
        return Err(Error::ErrInvalidPortNumber);
    }
    Ok(number as u16)
}
