use std::fmt;

use crate::transport::dtls::RTCDtlsTransportEvent;
use crate::transport::ice::RTCIceTransportEvent;
use crate::transport::ice::gatherer::RTCIceGathererEvent;
use crate::transport::redirect::RTCRedirectTransportEvent;

/// Negotiation progress of a [`Session`](super::Session).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Init,
    CertificateReady,
    Gathering,
    LocalParamsReady,
    AwaitingRemote,
    Negotiating,
    Connected,
    Closed,
    /// Terminal state entered after a fatal collaborator error.
    Failed,
}

const SESSION_STATE_INIT_STR: &str = "init";
const SESSION_STATE_CERTIFICATE_READY_STR: &str = "certificate-ready";
const SESSION_STATE_GATHERING_STR: &str = "gathering";
const SESSION_STATE_LOCAL_PARAMS_READY_STR: &str = "local-params-ready";
const SESSION_STATE_AWAITING_REMOTE_STR: &str = "awaiting-remote";
const SESSION_STATE_NEGOTIATING_STR: &str = "negotiating";
const SESSION_STATE_CONNECTED_STR: &str = "connected";
const SESSION_STATE_CLOSED_STR: &str = "closed";
const SESSION_STATE_FAILED_STR: &str = "failed";

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SessionState::Init => SESSION_STATE_INIT_STR,
            SessionState::CertificateReady => SESSION_STATE_CERTIFICATE_READY_STR,
            SessionState::Gathering => SESSION_STATE_GATHERING_STR,
            SessionState::LocalParamsReady => SESSION_STATE_LOCAL_PARAMS_READY_STR,
            SessionState::AwaitingRemote => SESSION_STATE_AWAITING_REMOTE_STR,
            SessionState::Negotiating => SESSION_STATE_NEGOTIATING_STR,
            SessionState::Connected => SESSION_STATE_CONNECTED_STR,
            SessionState::Closed => SESSION_STATE_CLOSED_STR,
            SessionState::Failed => SESSION_STATE_FAILED_STR,
        };
        write!(f, "{s}")
    }
}

/// Everything a session reacts to, funneled through
/// [`Session::handle_event`](super::Session::handle_event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    IceGatherer(RTCIceGathererEvent),
    IceTransport(RTCIceTransportEvent),
    DtlsTransport(RTCDtlsTransportEvent),
    RedirectTransport(RTCRedirectTransportEvent),
    /// One raw line read from the signaling input, terminator included.
    Signaling(Vec<u8>),
    /// The signaling input reached end of file.
    SignalingClosed,
    /// The process was asked to terminate.
    Terminate,
}
