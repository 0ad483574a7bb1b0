use std::collections::VecDeque;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::api::setting_engine::SettingEngine;
use crate::transport::ice::candidate::RTCIceCandidate;
use crate::transport::ice::gatherer_state::RTCIceGathererState;
use crate::transport::ice::parameters::RTCIceParameters;
use crate::transport::ice::server::RTCIceServer;
use shared::error::{Error, Result};
use shared::util::generate_crypto_random_string;

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const LEN_UFRAG: usize = 16;
const LEN_PWD: usize = 32;

/// STUN/TURN server could not be reached (W3C RTCPeerConnectionIceErrorEvent).
pub const ICE_ERROR_SERVER_UNREACHABLE: u16 = 701;

/// Destination used only to ask the routing table for the default source
/// address; nothing is ever sent to it.
const ROUTE_PROBE_ADDR: &str = "192.0.2.1:9";

/// Generates ICE pwd.
pub fn generate_pwd() -> String {
    generate_crypto_random_string(LEN_PWD, RUNES_ALPHA)
}

/// ICE user fragment.
pub fn generate_ufrag() -> String {
    generate_crypto_random_string(LEN_UFRAG, RUNES_ALPHA)
}

/// RTCIceGatherPolicy restricts which candidates are gathered.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceGatherPolicy {
    #[default]
    #[serde(rename = "all")]
    All,

    #[serde(rename = "nohost")]
    NoHost,

    #[serde(rename = "relay")]
    Relay,
}

const ICE_GATHER_POLICY_ALL_STR: &str = "all";
const ICE_GATHER_POLICY_NOHOST_STR: &str = "nohost";
const ICE_GATHER_POLICY_RELAY_STR: &str = "relay";

impl From<&str> for RTCIceGatherPolicy {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_GATHER_POLICY_NOHOST_STR => RTCIceGatherPolicy::NoHost,
            ICE_GATHER_POLICY_RELAY_STR => RTCIceGatherPolicy::Relay,
            _ => RTCIceGatherPolicy::All,
        }
    }
}

impl fmt::Display for RTCIceGatherPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceGatherPolicy::All => ICE_GATHER_POLICY_ALL_STR,
            RTCIceGatherPolicy::NoHost => ICE_GATHER_POLICY_NOHOST_STR,
            RTCIceGatherPolicy::Relay => ICE_GATHER_POLICY_RELAY_STR,
        };
        write!(f, "{s}")
    }
}

/// ICEGatherOptions provides options relating to the gathering of ICE candidates.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCIceGatherOptions {
    pub ice_servers: Vec<RTCIceServer>,
    pub ice_gather_policy: RTCIceGatherPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCIceGathererEvent {
    OnStateChange(RTCIceGathererState),
    OnError {
        url: String,
        error_code: u16,
        error_text: String,
    },
    /// `None` marks the end of gathering. The URL names the server the
    /// candidate was obtained from, if any.
    OnLocalCandidate(Option<RTCIceCandidate>, Option<String>),
}

/// Gathers local candidates and exposes the local ICE parameters that are
/// exchanged in signaling.
///
/// Events are queued as gathering progresses and drained through
/// [`IceGatherer::poll_event`]. Zero or more `OnLocalCandidate(Some(..))`
/// events are always followed by exactly one `OnLocalCandidate(None, _)`.
pub trait IceGatherer {
    fn gather(&mut self) -> Result<()>;
    fn get_local_parameters(&self) -> Result<RTCIceParameters>;
    fn get_local_candidates(&self) -> Result<Vec<RTCIceCandidate>>;
    fn close(&mut self) -> Result<()>;
    fn state(&self) -> RTCIceGathererState;
    fn poll_event(&mut self) -> Option<RTCIceGathererEvent>;
}

/// ICEGatherer gathers local host candidates by binding one UDP socket per
/// interface. Server reflexive and relay gathering is not performed; each
/// configured server URL is reported through an `OnError` event instead.
pub struct RTCIceGatherer {
    pub(crate) ice_servers: Vec<RTCIceServer>,
    pub(crate) gather_policy: RTCIceGatherPolicy,
    pub(crate) setting_engine: Arc<SettingEngine>,

    pub(crate) local_parameters: RTCIceParameters,
    pub(crate) candidates: Vec<RTCIceCandidate>,
    pub(crate) sockets: Vec<UdpSocket>,

    pub(crate) state: RTCIceGathererState,
    pub(crate) events: VecDeque<RTCIceGathererEvent>,
}

impl RTCIceGatherer {
    pub(crate) fn new(options: &RTCIceGatherOptions, setting_engine: Arc<SettingEngine>) -> Self {
        let candidates = &setting_engine.candidates;
        let username_fragment = if candidates.username_fragment.is_empty() {
            generate_ufrag()
        } else {
            candidates.username_fragment.clone()
        };
        let password = if candidates.password.is_empty() {
            generate_pwd()
        } else {
            candidates.password.clone()
        };
        let local_parameters = RTCIceParameters {
            username_fragment,
            password,
            ice_lite: candidates.ice_lite,
        };

        RTCIceGatherer {
            ice_servers: options.ice_servers.clone(),
            gather_policy: options.ice_gather_policy,
            setting_engine,

            local_parameters,
            candidates: vec![],
            sockets: vec![],

            state: RTCIceGathererState::New,
            events: VecDeque::new(),
        }
    }

    fn set_state(&mut self, s: RTCIceGathererState) {
        self.state = s;
        self.events
            .push_back(RTCIceGathererEvent::OnStateChange(s));
    }

    fn interfaces(&self) -> Vec<IpAddr> {
        let interfaces = &self.setting_engine.candidates.interfaces;
        if interfaces.is_empty() {
            vec![default_interface()]
        } else {
            interfaces.clone()
        }
    }

    fn gather_host_candidates(&mut self) {
        for ip in self.interfaces() {
            let socket = match UdpSocket::bind(SocketAddr::new(ip, 0)) {
                Ok(socket) => socket,
                Err(err) => {
                    warn!("failed to bind host candidate socket on {ip}: {err}");
                    continue;
                }
            };
            let local_addr = match socket.local_addr() {
                Ok(local_addr) => local_addr,
                Err(err) => {
                    warn!("failed to read local address of socket on {ip}: {err}");
                    continue;
                }
            };

            let candidate = RTCIceCandidate::new_host(local_addr);
            trace!("gathered host candidate {candidate}");
            self.candidates.push(candidate.clone());
            self.sockets.push(socket);
            self.events
                .push_back(RTCIceGathererEvent::OnLocalCandidate(Some(candidate), None));
        }
    }

    fn report_servers(&mut self) {
        let relay_only = self.gather_policy == RTCIceGatherPolicy::Relay;
        for server in &self.ice_servers {
            if relay_only && !server.is_turn() {
                continue;
            }
            for url in &server.urls {
                self.events.push_back(RTCIceGathererEvent::OnError {
                    url: url.clone(),
                    error_code: ICE_ERROR_SERVER_UNREACHABLE,
                    error_text: "server reflexive and relay gathering is unavailable".to_owned(),
                });
            }
        }
    }
}

/// Source address the routing table picks for outbound traffic, or the
/// IPv4 loopback address if there is no route.
fn default_interface() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(ROUTE_PROBE_ADDR)?;
        Ok(socket.local_addr()?.ip())
    };
    match probe() {
        Ok(ip) if !ip.is_unspecified() => ip,
        _ => {
            debug!("no default route, falling back to loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

impl IceGatherer for RTCIceGatherer {
    /// Gather ICE candidates.
    fn gather(&mut self) -> Result<()> {
        match self.state {
            RTCIceGathererState::New => {}
            RTCIceGathererState::Closed => return Err(Error::ErrICEGathererClosed),
            _ => return Err(Error::ErrICEGathererAlreadyStarted),
        }

        self.set_state(RTCIceGathererState::Gathering);

        if self.gather_policy == RTCIceGatherPolicy::All {
            self.gather_host_candidates();
        }
        self.report_servers();

        self.set_state(RTCIceGathererState::Complete);
        self.events
            .push_back(RTCIceGathererEvent::OnLocalCandidate(None, None));

        Ok(())
    }

    /// get_local_parameters returns the ICE parameters of the ICEGatherer.
    fn get_local_parameters(&self) -> Result<RTCIceParameters> {
        if self.state == RTCIceGathererState::Closed {
            return Err(Error::ErrICEGathererClosed);
        }
        Ok(self.local_parameters.clone())
    }

    /// get_local_candidates returns the sequence of valid local candidates associated with the ICEGatherer.
    fn get_local_candidates(&self) -> Result<Vec<RTCIceCandidate>> {
        match self.state {
            RTCIceGathererState::New => Err(Error::ErrICEGathererNotStarted),
            RTCIceGathererState::Closed => Err(Error::ErrICEGathererClosed),
            _ => Ok(self.candidates.clone()),
        }
    }

    /// Close prunes all local candidates, and closes the ports.
    fn close(&mut self) -> Result<()> {
        if self.state == RTCIceGathererState::Closed {
            return Ok(());
        }
        self.candidates.clear();
        self.sockets.clear();
        self.set_state(RTCIceGathererState::Closed);
        Ok(())
    }

    /// State indicates the current state of the ICE gatherer.
    fn state(&self) -> RTCIceGathererState {
        self.state
    }

    fn poll_event(&mut self) -> Option<RTCIceGathererEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::ice::candidate_type::RTCIceCandidateType;

    fn loopback_setting_engine() -> Arc<SettingEngine> {
        let mut setting_engine = SettingEngine::default();
        setting_engine.set_interfaces(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        Arc::new(setting_engine)
    }

    fn drain(gatherer: &mut RTCIceGatherer) -> Vec<RTCIceGathererEvent> {
        let mut events = vec![];
        while let Some(event) = gatherer.poll_event() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_generate_credentials() {
        let ufrag = generate_ufrag();
        let pwd = generate_pwd();
        assert_eq!(ufrag.len(), LEN_UFRAG);
        assert_eq!(pwd.len(), LEN_PWD);
        assert_ne!(generate_ufrag(), ufrag);
    }

    #[test]
    fn test_gather_host_candidates() -> Result<()> {
        let opts = RTCIceGatherOptions {
            ice_servers: vec![RTCIceServer::new(vec![
                "stun:stun.l.google.com:19302".to_owned(),
            ])],
            ..Default::default()
        };
        let mut gatherer = RTCIceGatherer::new(&opts, loopback_setting_engine());
        assert_eq!(gatherer.state(), RTCIceGathererState::New);
        assert_eq!(
            gatherer.get_local_candidates(),
            Err(Error::ErrICEGathererNotStarted)
        );

        gatherer.gather()?;
        let events = drain(&mut gatherer);

        assert_eq!(
            events.first(),
            Some(&RTCIceGathererEvent::OnStateChange(
                RTCIceGathererState::Gathering
            ))
        );
        assert_eq!(
            events.last(),
            Some(&RTCIceGathererEvent::OnLocalCandidate(None, None))
        );
        let errors: Vec<&RTCIceGathererEvent> = events
            .iter()
            .filter(|e| matches!(e, RTCIceGathererEvent::OnError { .. }))
            .collect();
        assert_eq!(errors.len(), 1);

        let candidates = gatherer.get_local_candidates()?;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].address, "127.0.0.1");
        assert_eq!(candidates[0].typ, RTCIceCandidateType::Host);
        assert_ne!(candidates[0].port, 0);
        assert_eq!(gatherer.state(), RTCIceGathererState::Complete);

        assert_eq!(gatherer.gather(), Err(Error::ErrICEGathererAlreadyStarted));

        Ok(())
    }

    #[test]
    fn test_gather_relay_policy_skips_host() -> Result<()> {
        let opts = RTCIceGatherOptions {
            ice_servers: vec![
                RTCIceServer::new(vec!["stun:stun.l.google.com:19302".to_owned()]),
                RTCIceServer::with_password_credential(
                    vec!["turn:turn.example.org".to_owned()],
                    "user",
                    "pass",
                ),
            ],
            ice_gather_policy: RTCIceGatherPolicy::Relay,
        };
        let mut gatherer = RTCIceGatherer::new(&opts, loopback_setting_engine());
        gatherer.gather()?;

        let events = drain(&mut gatherer);
        assert_eq!(
            events,
            vec![
                RTCIceGathererEvent::OnStateChange(RTCIceGathererState::Gathering),
                RTCIceGathererEvent::OnError {
                    url: "turn:turn.example.org".to_owned(),
                    error_code: ICE_ERROR_SERVER_UNREACHABLE,
                    error_text: "server reflexive and relay gathering is unavailable".to_owned(),
                },
                RTCIceGathererEvent::OnStateChange(RTCIceGathererState::Complete),
                RTCIceGathererEvent::OnLocalCandidate(None, None),
            ]
        );
        assert!(gatherer.get_local_candidates()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_gatherer_close() -> Result<()> {
        let mut gatherer =
            RTCIceGatherer::new(&RTCIceGatherOptions::default(), loopback_setting_engine());
        gatherer.gather()?;
        gatherer.close()?;
        gatherer.close()?;

        assert_eq!(gatherer.state(), RTCIceGathererState::Closed);
        assert!(gatherer.sockets.is_empty());
        assert_eq!(gatherer.gather(), Err(Error::ErrICEGathererClosed));
        assert_eq!(
            gatherer.get_local_parameters(),
            Err(Error::ErrICEGathererClosed)
        );

        Ok(())
    }

    #[test]
    fn test_fixed_credentials() -> Result<()> {
        let mut setting_engine = SettingEngine::default();
        setting_engine.set_ice_credentials("ufrag".to_owned(), "password".to_owned());
        setting_engine.set_lite(true);

        let gatherer =
            RTCIceGatherer::new(&RTCIceGatherOptions::default(), Arc::new(setting_engine));
        assert_eq!(
            gatherer.get_local_parameters()?,
            RTCIceParameters {
                username_fragment: "ufrag".to_owned(),
                password: "password".to_owned(),
                ice_lite: true,
            }
        );

        Ok(())
    }
}
