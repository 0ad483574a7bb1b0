use std::fmt;

use serde::{Deserialize, Serialize};

/// Indicates how an ICE candidate was obtained.
///
/// ICE prefers candidates in the order host, srflx, prflx, relay; the
/// preference feeds into the candidate priority (RFC 8445 Section 5.1.2.2).
///
/// ```
/// use ortc::transport::ice::candidate_type::RTCIceCandidateType;
///
/// let srflx: RTCIceCandidateType = "srflx".into();
/// assert_eq!(srflx, RTCIceCandidateType::Srflx);
/// assert_eq!(RTCIceCandidateType::Host.to_string(), "host");
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCIceCandidateType {
    #[default]
    Unspecified,

    /// A candidate obtained by binding to a specific port from an IP address
    /// on the host.
    #[serde(rename = "host")]
    Host,

    /// A candidate whose IP address and port are a binding allocated by a NAT
    /// for an ICE agent after it sends a packet through the NAT to a STUN server.
    #[serde(rename = "srflx")]
    Srflx,

    /// A candidate whose IP address and port are a binding allocated by a NAT
    /// for an ICE agent after it sends a packet through the NAT to its peer.
    #[serde(rename = "prflx")]
    Prflx,

    /// A candidate obtained from a relay server, such as a TURN server.
    #[serde(rename = "relay")]
    Relay,
}

const ICE_CANDIDATE_TYPE_HOST_STR: &str = "host";
const ICE_CANDIDATE_TYPE_SRFLX_STR: &str = "srflx";
const ICE_CANDIDATE_TYPE_PRFLX_STR: &str = "prflx";
const ICE_CANDIDATE_TYPE_RELAY_STR: &str = "relay";

///  takes a string and converts it into ICECandidateType
impl From<&str> for RTCIceCandidateType {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CANDIDATE_TYPE_HOST_STR => RTCIceCandidateType::Host,
            ICE_CANDIDATE_TYPE_SRFLX_STR => RTCIceCandidateType::Srflx,
            ICE_CANDIDATE_TYPE_PRFLX_STR => RTCIceCandidateType::Prflx,
            ICE_CANDIDATE_TYPE_RELAY_STR => RTCIceCandidateType::Relay,
            _ => RTCIceCandidateType::Unspecified,
        }
    }
}

impl RTCIceCandidateType {
    /// Type preference from RFC 8445 Section 5.1.2.2.
    pub fn preference(&self) -> u16 {
        match *self {
            RTCIceCandidateType::Host => 126,
            RTCIceCandidateType::Prflx => 110,
            RTCIceCandidateType::Srflx => 100,
            RTCIceCandidateType::Relay | RTCIceCandidateType::Unspecified => 0,
        }
    }
}

impl fmt::Display for RTCIceCandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCIceCandidateType::Host => write!(f, "{ICE_CANDIDATE_TYPE_HOST_STR}"),
            RTCIceCandidateType::Srflx => write!(f, "{ICE_CANDIDATE_TYPE_SRFLX_STR}"),
            RTCIceCandidateType::Prflx => write!(f, "{ICE_CANDIDATE_TYPE_PRFLX_STR}"),
            RTCIceCandidateType::Relay => write!(f, "{ICE_CANDIDATE_TYPE_RELAY_STR}"),
            _ => write!(f, "{}", crate::configuration::UNSPECIFIED_STR),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_candidate_type() {
        let tests = vec![
            ("Unspecified", RTCIceCandidateType::Unspecified),
            ("host", RTCIceCandidateType::Host),
            ("srflx", RTCIceCandidateType::Srflx),
            ("prflx", RTCIceCandidateType::Prflx),
            ("relay", RTCIceCandidateType::Relay),
            ("HOST", RTCIceCandidateType::Unspecified),
        ];

        for (type_string, expected_type) in tests {
            let actual = RTCIceCandidateType::from(type_string);
            assert_eq!(actual, expected_type);
        }
    }

    #[test]
    fn test_ice_candidate_type_preference() {
        assert!(RTCIceCandidateType::Host.preference() > RTCIceCandidateType::Prflx.preference());
        assert!(RTCIceCandidateType::Prflx.preference() > RTCIceCandidateType::Srflx.preference());
        assert!(RTCIceCandidateType::Srflx.preference() > RTCIceCandidateType::Relay.preference());
    }
}
