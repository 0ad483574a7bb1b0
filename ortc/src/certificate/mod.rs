//! Self-signed X.509 identity used by the DTLS transport.
//!
//! Certificates are generated with `rcgen` and identified towards the remote
//! peer through their SHA-256 fingerprint, which travels in the
//! `dtlsParameters.fingerprints` list of the signaling document.

use std::ops::Add;
use std::time::{Duration, SystemTime};

use rcgen::{CertificateParams, KeyPair};
use sha2::{Digest, Sha256};

use crate::transport::dtls::fingerprint::{RTCDtlsFingerprint, RTCDtlsFingerprintAlgorithm};
use shared::error::{Error, Result};
use shared::util::math_rand_alpha;

/// Generates the identity a session presents during the DTLS handshake.
pub trait CertificateProvisioner {
    fn generate_certificate(&mut self) -> Result<RTCCertificate>;
}

/// Certificate represents the x509 identity presented in the DTLS handshake.
#[derive(Clone, Debug)]
pub struct RTCCertificate {
    /// DER encoded certificate chain, leaf first.
    pub(crate) certificate: Vec<Vec<u8>>,
    /// DER encoded PKCS#8 private key.
    pub(crate) private_key: Vec<u8>,
    pub(crate) expires: SystemTime,
}

impl PartialEq for RTCCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.certificate == other.certificate
    }
}

impl RTCCertificate {
    fn from_params(params: CertificateParams, key_pair: KeyPair) -> Result<Self> {
        let not_after = params.not_after;

        let x509_cert = params.self_signed(&key_pair)?;
        let private_key = key_pair.serialize_der();

        let expires = if cfg!(target_arch = "arm") {
            // Workaround for issue overflow when adding duration to instant on armv7
            // https://github.com/webrtc-rs/examples/issues/5 https://github.com/chronotope/chrono/issues/343
            SystemTime::now().add(Duration::from_secs(172800)) //60*60*48 or 2 days
        } else {
            not_after.into()
        };

        Ok(Self {
            certificate: vec![x509_cert.der().to_vec()],
            private_key,
            expires,
        })
    }

    /// Creates a self-signed certificate for `key_pair` with a random common name.
    pub fn from_key_pair(key_pair: KeyPair) -> Result<Self> {
        if !(key_pair.is_compatible(&rcgen::PKCS_ED25519)
            || key_pair.is_compatible(&rcgen::PKCS_ECDSA_P256_SHA256))
        {
            return Err(Error::Other("Unsupported key_pair".to_owned()));
        }

        RTCCertificate::from_params(CertificateParams::new(vec![math_rand_alpha(16)])?, key_pair)
    }

    /// Generates an ECDSA P-256 key pair and a certificate for it.
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        RTCCertificate::from_key_pair(key_pair)
    }

    /// expires returns the timestamp after which this certificate is no longer valid.
    pub fn expires(&self) -> SystemTime {
        self.expires
    }

    pub fn is_expired(&self) -> bool {
        self.expires <= SystemTime::now()
    }

    /// get_fingerprints returns the list of certificate fingerprints, one of which
    /// is computed with the digest algorithm used in the certificate signature.
    pub fn get_fingerprints(&self) -> Vec<RTCDtlsFingerprint> {
        let mut fingerprints = Vec::new();

        for c in &self.certificate {
            let mut h = Sha256::new();
            h.update(c);
            let hashed = h.finalize();
            let values: Vec<String> = hashed.iter().map(|x| format! {"{x:02x}"}).collect();

            fingerprints.push(RTCDtlsFingerprint {
                algorithm: RTCDtlsFingerprintAlgorithm::Sha256,
                value: values.join(":"),
            });
        }

        fingerprints
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_certificate_rsa() -> Result<()> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256);
        assert!(key_pair.is_err(), "RcgenError::KeyGenerationUnavailable");

        Ok(())
    }

    #[test]
    fn test_generate_certificate_ecdsa() -> Result<()> {
        let cert = RTCCertificate::generate()?;
        assert_eq!(cert.certificate.len(), 1);
        assert!(!cert.private_key.is_empty());

        Ok(())
    }

    #[test]
    fn test_generate_certificate_eddsa() -> Result<()> {
        let kp = KeyPair::generate_for(&rcgen::PKCS_ED25519)?;
        let _cert = RTCCertificate::from_key_pair(kp)?;

        Ok(())
    }

    #[test]
    fn test_certificate_equal() -> Result<()> {
        let cert1 = RTCCertificate::generate()?;
        let cert2 = RTCCertificate::generate()?;

        assert_ne!(cert1, cert2);
        assert_eq!(cert1, cert1.clone());

        Ok(())
    }

    #[test]
    fn test_generate_certificate_expires() -> Result<()> {
        let cert = RTCCertificate::generate()?;

        let now = SystemTime::now();
        assert!(cert.expires().duration_since(now).is_ok());
        assert!(!cert.is_expired());

        Ok(())
    }

    #[test]
    fn test_certificate_fingerprints() -> Result<()> {
        let cert = RTCCertificate::generate()?;
        let fingerprints = cert.get_fingerprints();

        assert_eq!(fingerprints.len(), 1);
        assert_eq!(fingerprints[0].algorithm, RTCDtlsFingerprintAlgorithm::Sha256);
        assert!(fingerprints[0].is_well_formed(), "{}", fingerprints[0]);
        assert_eq!(fingerprints[0].value, fingerprints[0].value.to_lowercase());

        Ok(())
    }
}
