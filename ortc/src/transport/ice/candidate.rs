use std::fmt;
use std::net::SocketAddr;

use crc::{CRC_32_ISCSI, Crc};
use serde::{Deserialize, Serialize};

use super::candidate_type::RTCIceCandidateType;
use super::protocol::RTCIceProtocol;

/// Component ID of the single RTP-less data stream the session negotiates.
pub const DEFAULT_COMPONENT: u16 = 1;

/// The local preference used for host candidates when only one address per
/// interface is gathered.
pub(crate) const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;

#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceTcpCandidateType {
    #[default]
    Unspecified,

    #[serde(rename = "active")]
    Active,

    #[serde(rename = "passive")]
    Passive,

    #[serde(rename = "so")]
    SimultaneousOpen,
}

const TCP_TYPE_ACTIVE_STR: &str = "active";
const TCP_TYPE_PASSIVE_STR: &str = "passive";
const TCP_TYPE_SIMULTANEOUS_OPEN_STR: &str = "so";

impl From<&str> for RTCIceTcpCandidateType {
    fn from(raw: &str) -> Self {
        match raw {
            TCP_TYPE_ACTIVE_STR => RTCIceTcpCandidateType::Active,
            TCP_TYPE_PASSIVE_STR => RTCIceTcpCandidateType::Passive,
            TCP_TYPE_SIMULTANEOUS_OPEN_STR => RTCIceTcpCandidateType::SimultaneousOpen,
            _ => RTCIceTcpCandidateType::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceTcpCandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceTcpCandidateType::Active => TCP_TYPE_ACTIVE_STR,
            RTCIceTcpCandidateType::Passive => TCP_TYPE_PASSIVE_STR,
            RTCIceTcpCandidateType::SimultaneousOpen => TCP_TYPE_SIMULTANEOUS_OPEN_STR,
            RTCIceTcpCandidateType::Unspecified => crate::configuration::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// Convey transport addresses related to the candidate, useful for
/// diagnostics and other purposes.
#[derive(Default, PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRelatedAddress {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for CandidateRelatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " related {}:{}", self.address, self.port)
    }
}

/// ICECandidate represents a ice candidate
///
/// `tcp_type` is only meaningful when `protocol` is TCP; candidates on any
/// other protocol carry `Active`. The related address and port travel
/// together, a candidate either has both or neither.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCIceCandidate {
    pub foundation: String,
    pub priority: u32,
    pub address: String,
    pub protocol: RTCIceProtocol,
    pub port: u16,
    pub typ: RTCIceCandidateType,
    pub tcp_type: RTCIceTcpCandidateType,
    pub related_address: Option<CandidateRelatedAddress>,
}

impl RTCIceCandidate {
    /// Creates a UDP host candidate for a locally bound socket address.
    pub fn new_host(local_addr: SocketAddr) -> Self {
        let mut candidate = RTCIceCandidate {
            address: local_addr.ip().to_string(),
            protocol: RTCIceProtocol::Udp,
            port: local_addr.port(),
            typ: RTCIceCandidateType::Host,
            tcp_type: RTCIceTcpCandidateType::Active,
            ..Default::default()
        };
        candidate.foundation = candidate.compute_foundation();
        candidate.priority = candidate.compute_priority(DEFAULT_LOCAL_PREFERENCE);
        candidate
    }

    /// Foundation shared by all candidates of the same type, base address
    /// and protocol.
    pub fn compute_foundation(&self) -> String {
        let mut buf = vec![];
        buf.extend_from_slice(self.typ.to_string().as_bytes());
        buf.extend_from_slice(self.address.as_bytes());
        buf.extend_from_slice(self.protocol.to_string().as_bytes());

        let checksum = Crc::<u32>::new(&CRC_32_ISCSI).checksum(&buf);

        format!("{checksum}")
    }

    /// Computes the priority for this ICE Candidate.
    pub fn compute_priority(&self, local_preference: u16) -> u32 {
        // The local preference MUST be an integer from 0 (lowest preference) to
        // 65535 (highest preference) inclusive.  When there is only a single IP
        // address, this value SHOULD be set to 65535.
        (1 << 24) * u32::from(self.typ.preference())
            + (1 << 8) * u32::from(local_preference)
            + (256 - u32::from(DEFAULT_COMPONENT))
    }
}

impl fmt::Display for RTCIceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}:{}",
            self.foundation, self.protocol, self.typ, self.address, self.port,
        )?;
        if self.protocol == RTCIceProtocol::Tcp {
            write!(f, " tcptype {}", self.tcp_type)?;
        }
        if let Some(related_address) = &self.related_address {
            write!(f, "{related_address}")?;
        }
        Ok(())
    }
}
