use serde::{Deserialize, Serialize};

use super::fingerprint::*;
use super::role::*;

/// DTLSParameters holds information relating to DTLS configuration.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsParameters {
    pub role: RTCDtlsRole,
    pub fingerprints: Vec<RTCDtlsFingerprint>,
}
