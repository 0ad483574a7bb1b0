use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;

use log::debug;

use shared::error::{Error, Result};

/// Indicates the state of the redirect transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCRedirectTransportState {
    #[default]
    Unspecified,
    New,
    Connecting,
    Connected,
    Closed,
    Failed,
}

const REDIRECT_TRANSPORT_STATE_NEW_STR: &str = "new";
const REDIRECT_TRANSPORT_STATE_CONNECTING_STR: &str = "connecting";
const REDIRECT_TRANSPORT_STATE_CONNECTED_STR: &str = "connected";
const REDIRECT_TRANSPORT_STATE_CLOSED_STR: &str = "closed";
const REDIRECT_TRANSPORT_STATE_FAILED_STR: &str = "failed";

impl fmt::Display for RTCRedirectTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCRedirectTransportState::New => REDIRECT_TRANSPORT_STATE_NEW_STR,
            RTCRedirectTransportState::Connecting => REDIRECT_TRANSPORT_STATE_CONNECTING_STR,
            RTCRedirectTransportState::Connected => REDIRECT_TRANSPORT_STATE_CONNECTED_STR,
            RTCRedirectTransportState::Closed => REDIRECT_TRANSPORT_STATE_CLOSED_STR,
            RTCRedirectTransportState::Failed => REDIRECT_TRANSPORT_STATE_FAILED_STR,
            RTCRedirectTransportState::Unspecified => crate::configuration::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCRedirectTransportEvent {
    OnStateChange(RTCRedirectTransportState),
}

/// Application data transport that forwards the secured stream to a fixed
/// external address.
pub trait RedirectTransport {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn state(&self) -> RTCRedirectTransportState;
    fn poll_event(&mut self) -> Option<RTCRedirectTransportEvent>;
}

/// RedirectTransport bound to the destination given on the command line.
/// Once the DTLS transport is connected, the SCTP association carried over it
/// is relayed to `address`.
pub struct RTCRedirectTransport {
    pub(crate) address: SocketAddr,
    pub(crate) state: RTCRedirectTransportState,
    pub(crate) events: VecDeque<RTCRedirectTransportEvent>,
}

impl RTCRedirectTransport {
    pub(crate) fn new(address: SocketAddr) -> Self {
        RTCRedirectTransport {
            address,
            state: RTCRedirectTransportState::New,
            events: VecDeque::new(),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn state_change(&mut self, state: RTCRedirectTransportState) {
        self.state = state;
        self.events
            .push_back(RTCRedirectTransportEvent::OnStateChange(state));
    }
}

impl RedirectTransport for RTCRedirectTransport {
    fn start(&mut self) -> Result<()> {
        if self.state != RTCRedirectTransportState::New {
            return Err(Error::ErrInvalidRedirectStart);
        }

        debug!("redirecting to {}", self.address);
        self.state_change(RTCRedirectTransportState::Connecting);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.state == RTCRedirectTransportState::Closed {
            return Ok(());
        }
        self.state_change(RTCRedirectTransportState::Closed);
        Ok(())
    }

    fn state(&self) -> RTCRedirectTransportState {
        self.state
    }

    fn poll_event(&mut self) -> Option<RTCRedirectTransportEvent> {
        self.events.pop_front()
    }
}
