use std::collections::VecDeque;
use std::fmt;

use log::{debug, info};

use candidate::{RTCIceCandidate, RTCIceTcpCandidateType};
use gatherer::IceGatherer;
use gatherer_state::RTCIceGathererState;
use parameters::RTCIceParameters;
use role::RTCIceRole;
use state::RTCIceTransportState;
use shared::error::{Error, Result};

pub mod candidate;
pub mod candidate_type;
pub mod gatherer;
pub mod gatherer_state;
pub mod parameters;
pub mod protocol;
pub mod role;
pub mod server;
pub mod state;

/// A pair of local and remote candidates selected for connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCIceCandidatePair {
    pub local: RTCIceCandidate,
    pub remote: RTCIceCandidate,
}

impl fmt::Display for RTCIceCandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(local) {} <-> (remote) {}", self.local, self.remote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCIceTransportEvent {
    OnStateChange(RTCIceTransportState),
    OnSelectedCandidatePairChange(Box<RTCIceCandidatePair>),
}

/// Runs connectivity checks between the local candidates of a gatherer and
/// the remote candidates received through signaling.
pub trait IceTransport {
    fn set_remote_candidates(&mut self, remote_candidates: &[RTCIceCandidate]) -> Result<()>;
    fn start(
        &mut self,
        gatherer: &dyn IceGatherer,
        remote_parameters: &RTCIceParameters,
        role: RTCIceRole,
    ) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn state(&self) -> RTCIceTransportState;
    fn poll_event(&mut self) -> Option<RTCIceTransportEvent>;
}

/// ICETransport records the negotiated parameters and moves into the
/// checking state on start. Connectivity checks themselves are run by the
/// ICE agent that owns the sockets.
#[derive(Default)]
pub struct RTCIceTransport {
    pub(crate) role: RTCIceRole,
    pub(crate) local_parameters: Option<RTCIceParameters>,
    pub(crate) local_candidates: Vec<RTCIceCandidate>,
    pub(crate) remote_parameters: Option<RTCIceParameters>,
    pub(crate) remote_candidates: Vec<RTCIceCandidate>,

    pub(crate) state: RTCIceTransportState,
    pub(crate) events: VecDeque<RTCIceTransportEvent>,
}

impl RTCIceTransport {
    pub(crate) fn new() -> Self {
        RTCIceTransport {
            state: RTCIceTransportState::New,
            ..Default::default()
        }
    }

    fn state_change(&mut self, state: RTCIceTransportState) {
        self.state = state;
        self.events
            .push_back(RTCIceTransportEvent::OnStateChange(state));
    }

    pub fn role(&self) -> RTCIceRole {
        self.role
    }

    pub fn remote_candidates(&self) -> &[RTCIceCandidate] {
        &self.remote_candidates
    }
}

impl IceTransport for RTCIceTransport {
    fn set_remote_candidates(&mut self, remote_candidates: &[RTCIceCandidate]) -> Result<()> {
        if self.state == RTCIceTransportState::Closed {
            return Err(Error::ErrICETransportNotInNew);
        }

        for c in remote_candidates {
            if c.tcp_type == RTCIceTcpCandidateType::Active
                && c.protocol == protocol::RTCIceProtocol::Tcp
            {
                // TCP Candidates with tcptype active will probe server passive ones, so
                // no need to do anything with them.
                info!("Ignoring remote candidate with tcpType active: {c}");
                continue;
            }
            debug!("adding remote candidate {c}");
            self.remote_candidates.push(c.clone());
        }

        Ok(())
    }

    /// start incoming connectivity checks based on its configured role.
    fn start(
        &mut self,
        gatherer: &dyn IceGatherer,
        remote_parameters: &RTCIceParameters,
        role: RTCIceRole,
    ) -> Result<()> {
        if self.state != RTCIceTransportState::New {
            return Err(Error::ErrICETransportNotInNew);
        }
        if role == RTCIceRole::Unspecified {
            return Err(Error::ErrICERoleUnknown);
        }
        match gatherer.state() {
            RTCIceGathererState::Gathering | RTCIceGathererState::Complete => {}
            _ => return Err(Error::ErrICEGathererNotStarted),
        }

        self.local_parameters = Some(gatherer.get_local_parameters()?);
        self.local_candidates = gatherer.get_local_candidates()?;
        self.remote_parameters = Some(remote_parameters.clone());
        self.role = role;

        debug!(
            "ICE transport started as {} with {} local and {} remote candidates",
            role,
            self.local_candidates.len(),
            self.remote_candidates.len()
        );
        self.state_change(RTCIceTransportState::Checking);

        Ok(())
    }

    /// Stop irreversibly stops the ICETransport.
    fn stop(&mut self) -> Result<()> {
        if self.state == RTCIceTransportState::Closed {
            return Ok(());
        }
        self.remote_candidates.clear();
        self.local_candidates.clear();
        self.state_change(RTCIceTransportState::Closed);
        Ok(())
    }

    fn state(&self) -> RTCIceTransportState {
        self.state
    }

    fn poll_event(&mut self) -> Option<RTCIceTransportEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod test {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use super::*;
    use crate::api::setting_engine::SettingEngine;
    use crate::transport::ice::candidate_type::RTCIceCandidateType;
    use crate::transport::ice::gatherer::{RTCIceGatherOptions, RTCIceGatherer};
    use crate::transport::ice::protocol::RTCIceProtocol;

    fn new_gatherer() -> RTCIceGatherer {
        let mut setting_engine = SettingEngine::default();
        setting_engine.set_interfaces(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        RTCIceGatherer::new(&RTCIceGatherOptions::default(), Arc::new(setting_engine))
    }

    fn remote_parameters() -> RTCIceParameters {
        RTCIceParameters {
            username_fragment: "remoteufrag".to_owned(),
            password: "remotepassword".to_owned(),
            ice_lite: false,
        }
    }

    #[test]
    fn test_ice_transport_start() -> Result<()> {
        let mut gatherer = new_gatherer();
        let mut transport = RTCIceTransport::new();

        assert_eq!(
            transport.start(&gatherer, &remote_parameters(), RTCIceRole::Controlling),
            Err(Error::ErrICEGathererNotStarted)
        );

        gatherer.gather()?;
        transport.set_remote_candidates(&[
            RTCIceCandidate {
                foundation: "1".to_owned(),
                address: "10.0.0.1".to_owned(),
                protocol: RTCIceProtocol::Udp,
                port: 4000,
                typ: RTCIceCandidateType::Host,
                tcp_type: RTCIceTcpCandidateType::Active,
                ..Default::default()
            },
            RTCIceCandidate {
                foundation: "2".to_owned(),
                address: "10.0.0.1".to_owned(),
                protocol: RTCIceProtocol::Tcp,
                port: 9,
                typ: RTCIceCandidateType::Host,
                tcp_type: RTCIceTcpCandidateType::Active,
                ..Default::default()
            },
        ])?;
        assert_eq!(transport.remote_candidates().len(), 1);

        assert_eq!(
            transport.start(&gatherer, &remote_parameters(), RTCIceRole::Unspecified),
            Err(Error::ErrICERoleUnknown)
        );

        transport.start(&gatherer, &remote_parameters(), RTCIceRole::Controlled)?;
        assert_eq!(transport.state(), RTCIceTransportState::Checking);
        assert_eq!(transport.role(), RTCIceRole::Controlled);
        assert_eq!(
            transport.poll_event(),
            Some(RTCIceTransportEvent::OnStateChange(
                RTCIceTransportState::Checking
            ))
        );

        assert_eq!(
            transport.start(&gatherer, &remote_parameters(), RTCIceRole::Controlled),
            Err(Error::ErrICETransportNotInNew)
        );

        Ok(())
    }

    #[test]
    fn test_ice_transport_stop() -> Result<()> {
        let mut transport = RTCIceTransport::new();
        transport.stop()?;
        transport.stop()?;

        assert_eq!(transport.state(), RTCIceTransportState::Closed);
        assert_eq!(
            transport.poll_event(),
            Some(RTCIceTransportEvent::OnStateChange(
                RTCIceTransportState::Closed
            ))
        );
        assert_eq!(transport.poll_event(), None);

        Ok(())
    }
}
