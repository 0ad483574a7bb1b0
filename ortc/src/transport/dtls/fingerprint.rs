use std::fmt;

use serde::{Deserialize, Serialize};

/// Hash function from the 'Hash function Textual Names' registry used to
/// compute a certificate fingerprint.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsFingerprintAlgorithm {
    #[default]
    Unspecified,

    #[serde(rename = "sha-1")]
    Sha1,
    #[serde(rename = "sha-224")]
    Sha224,
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-384")]
    Sha384,
    #[serde(rename = "sha-512")]
    Sha512,
}

const SHA1_STR: &str = "sha-1";
const SHA224_STR: &str = "sha-224";
const SHA256_STR: &str = "sha-256";
const SHA384_STR: &str = "sha-384";
const SHA512_STR: &str = "sha-512";

impl From<&str> for RTCDtlsFingerprintAlgorithm {
    fn from(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            SHA1_STR => RTCDtlsFingerprintAlgorithm::Sha1,
            SHA224_STR => RTCDtlsFingerprintAlgorithm::Sha224,
            SHA256_STR => RTCDtlsFingerprintAlgorithm::Sha256,
            SHA384_STR => RTCDtlsFingerprintAlgorithm::Sha384,
            SHA512_STR => RTCDtlsFingerprintAlgorithm::Sha512,
            _ => RTCDtlsFingerprintAlgorithm::Unspecified,
        }
    }
}

impl fmt::Display for RTCDtlsFingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCDtlsFingerprintAlgorithm::Sha1 => SHA1_STR,
            RTCDtlsFingerprintAlgorithm::Sha224 => SHA224_STR,
            RTCDtlsFingerprintAlgorithm::Sha256 => SHA256_STR,
            RTCDtlsFingerprintAlgorithm::Sha384 => SHA384_STR,
            RTCDtlsFingerprintAlgorithm::Sha512 => SHA512_STR,
            RTCDtlsFingerprintAlgorithm::Unspecified => crate::configuration::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCDtlsFingerprintAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match *self {
            RTCDtlsFingerprintAlgorithm::Sha1 => 20,
            RTCDtlsFingerprintAlgorithm::Sha224 => 28,
            RTCDtlsFingerprintAlgorithm::Sha256 => 32,
            RTCDtlsFingerprintAlgorithm::Sha384 => 48,
            RTCDtlsFingerprintAlgorithm::Sha512 => 64,
            RTCDtlsFingerprintAlgorithm::Unspecified => 0,
        }
    }
}

/// DTLS certificate fingerprint for authentication.
///
/// The value is the colon-separated hex digest of the certificate, for
/// example `"ab:cd:ef:01:..."` (RFC 4572 Section 5).
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    pub algorithm: RTCDtlsFingerprintAlgorithm,
    pub value: String,
}

impl RTCDtlsFingerprint {
    /// Whether the value holds exactly as many hex bytes as the algorithm's
    /// digest produces.
    pub fn is_well_formed(&self) -> bool {
        let bytes: Vec<&str> = self.value.split(':').collect();
        bytes.len() == self.algorithm.digest_len()
            && bytes
                .iter()
                .all(|b| b.len() == 2 && b.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl fmt::Display for RTCDtlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fingerprint_algorithm() {
        let tests = vec![
            ("sha-1", RTCDtlsFingerprintAlgorithm::Sha1, 20),
            ("sha-224", RTCDtlsFingerprintAlgorithm::Sha224, 28),
            ("sha-256", RTCDtlsFingerprintAlgorithm::Sha256, 32),
            ("SHA-256", RTCDtlsFingerprintAlgorithm::Sha256, 32),
            ("sha-384", RTCDtlsFingerprintAlgorithm::Sha384, 48),
            ("sha-512", RTCDtlsFingerprintAlgorithm::Sha512, 64),
            ("md5", RTCDtlsFingerprintAlgorithm::Unspecified, 0),
        ];

        for (algorithm_string, expected_algorithm, expected_len) in tests {
            let algorithm = RTCDtlsFingerprintAlgorithm::from(algorithm_string);
            assert_eq!(algorithm, expected_algorithm, "{algorithm_string}");
            assert_eq!(algorithm.digest_len(), expected_len, "{algorithm_string}");
        }
    }

    #[test]
    fn test_fingerprint_well_formed() {
        let sha1 = vec!["ab"; 20].join(":");
        let tests = vec![
            (RTCDtlsFingerprintAlgorithm::Sha1, sha1.clone(), true),
            (RTCDtlsFingerprintAlgorithm::Sha256, sha1.clone(), false),
            (RTCDtlsFingerprintAlgorithm::Sha1, sha1.replace("ab", "zz"), false),
            (RTCDtlsFingerprintAlgorithm::Sha1, "".to_owned(), false),
        ];

        for (algorithm, value, expected) in tests {
            let fingerprint = RTCDtlsFingerprint { algorithm, value };
            assert_eq!(fingerprint.is_well_formed(), expected, "{fingerprint}");
        }
    }
}
