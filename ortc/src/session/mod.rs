//! The negotiation state machine driving one peer's transports.


pub mod event;

use std::collections::VecDeque;
use std::panic::Location;

use log::{debug, error, info, trace, warn};

pub use event::{SessionEvent, SessionState};

use crate::api::TransportFactory;
use crate::certificate::RTCCertificate;
use crate::configuration::SessionConfig;
use crate::parameters::Parameters;
use crate::parameters::codec::ParameterCodec;
use crate::signaling::{SignalingChannel, is_end_marker};
use crate::transport::dtls::RTCDtlsTransportEvent;
use crate::transport::dtls::state::RTCDtlsTransportState;
use crate::transport::ice::RTCIceTransportEvent;
use crate::transport::ice::gatherer::{RTCIceGatherOptions, RTCIceGathererEvent};
use crate::transport::redirect::RTCRedirectTransportEvent;
use crate::transport::{DtlsTransport, IceGatherer, IceTransport, RedirectTransport};
use shared::error::{Error, Result};

/// Session owns one peer's certificate, transports and parameters, and moves
/// them through negotiation one event at a time.
///
/// Collaborators queue their events; [`Session::poll_event`] drains them and
/// [`Session::handle_event`] is the only place the state machine advances.
/// An error returned from `handle_event` is fatal and should be passed to
/// [`Session::fail`], which shuts everything down and yields the exit status.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    codec: ParameterCodec,
    signaling: Box<dyn SignalingChannel>,

    certificate: Option<RTCCertificate>,
    gather_options: Option<RTCIceGatherOptions>,
    gatherer: Option<Box<dyn IceGatherer>>,
    ice_transport: Option<Box<dyn IceTransport>>,
    dtls_transport: Option<Box<dyn DtlsTransport>>,
    redirect_transport: Option<Box<dyn RedirectTransport>>,

    local_parameters: Option<Parameters>,
    remote_parameters: Option<Parameters>,
    /// Signaling lines received before local parameters were published.
    pending: VecDeque<Vec<u8>>,
}

impl Session {
    pub fn new(config: SessionConfig, signaling: Box<dyn SignalingChannel>) -> Self {
        Session::with_codec(config, signaling, ParameterCodec::default())
    }

    pub fn with_codec(
        config: SessionConfig,
        signaling: Box<dyn SignalingChannel>,
        codec: ParameterCodec,
    ) -> Self {
        Session {
            config,
            state: SessionState::Init,
            codec,
            signaling,
            certificate: None,
            gather_options: None,
            gatherer: None,
            ice_transport: None,
            dtls_transport: None,
            redirect_transport: None,
            local_parameters: None,
            remote_parameters: None,
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed | SessionState::Failed)
    }

    pub fn local_parameters(&self) -> Option<&Parameters> {
        self.local_parameters.as_ref()
    }

    pub fn remote_parameters(&self) -> Option<&Parameters> {
        self.remote_parameters.as_ref()
    }

    fn label(&self) -> &str {
        self.config.name()
    }

    fn state_change(&mut self, state: SessionState) {
        if self.state != state {
            info!("({}) session state: {} -> {}", self.label(), self.state, state);
            self.state = state;
        }
    }

    /// Provisions the certificate, creates every transport and starts
    /// gathering. Gathering results arrive later through [`Session::poll_event`].
    pub fn start(&mut self, factory: &mut dyn TransportFactory) -> Result<()> {
        if self.state != SessionState::Init {
            return Err(Error::ErrSessionAlreadyStarted);
        }

        let certificate = factory.generate_certificate()?;
        debug!(
            "({}) certificate ready: {}",
            self.label(),
            certificate
                .get_fingerprints()
                .iter()
                .map(|fingerprint| fingerprint.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.certificate = Some(certificate.clone());
        self.state_change(SessionState::CertificateReady);

        let gather_options = self.config.gather_options().clone();
        self.gatherer = Some(factory.new_ice_gatherer(&gather_options)?);
        self.gather_options = Some(gather_options);
        self.ice_transport = Some(factory.new_ice_transport()?);
        self.dtls_transport = Some(factory.new_dtls_transport(vec![certificate])?);
        self.redirect_transport =
            Some(factory.new_redirect_transport(self.config.redirect_address())?);

        let label = self.config.name();
        if let Some(gatherer) = self.gatherer.as_mut() {
            checked(label, "start gathering", gatherer.gather())?;
        }
        self.state_change(SessionState::Gathering);

        Ok(())
    }

    /// Takes the next queued collaborator event, if any.
    pub fn poll_event(&mut self) -> Option<SessionEvent> {
        if let Some(event) = self.gatherer.as_mut().and_then(|g| g.poll_event()) {
            return Some(SessionEvent::IceGatherer(event));
        }
        if let Some(event) = self.ice_transport.as_mut().and_then(|t| t.poll_event()) {
            return Some(SessionEvent::IceTransport(event));
        }
        if let Some(event) = self.dtls_transport.as_mut().and_then(|t| t.poll_event()) {
            return Some(SessionEvent::DtlsTransport(event));
        }
        if let Some(event) = self.redirect_transport.as_mut().and_then(|t| t.poll_event()) {
            return Some(SessionEvent::RedirectTransport(event));
        }
        None
    }

    /// Handles collaborator events until every queue is empty.
    pub fn drain_events(&mut self) -> Result<()> {
        while let Some(event) = self.poll_event() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        if self.is_closed() {
            trace!("({}) session {}, dropping {:?}", self.label(), self.state, event);
            return Ok(());
        }

        match event {
            SessionEvent::IceGatherer(event) => self.on_ice_gatherer_event(event),
            SessionEvent::IceTransport(event) => {
                self.on_ice_transport_event(event);
                Ok(())
            }
            SessionEvent::DtlsTransport(event) => self.on_dtls_transport_event(event),
            SessionEvent::RedirectTransport(RTCRedirectTransportEvent::OnStateChange(state)) => {
                info!("({}) redirect transport state: {}", self.label(), state);
                Ok(())
            }
            SessionEvent::Signaling(line) => self.on_signaling_message(line),
            SessionEvent::SignalingClosed => {
                info!("({}) signaling input closed", self.label());
                self.close()
            }
            SessionEvent::Terminate => {
                info!("({}) termination requested", self.label());
                self.close()
            }
        }
    }

    fn on_ice_gatherer_event(&mut self, event: RTCIceGathererEvent) -> Result<()> {
        match event {
            RTCIceGathererEvent::OnStateChange(state) => {
                info!("({}) ICE gatherer state: {}", self.label(), state);
            }
            RTCIceGathererEvent::OnError {
                url,
                error_code,
                error_text,
            } => {
                warn!(
                    "({}) ICE gatherer error: {} ({}) {}",
                    self.label(),
                    error_text,
                    error_code,
                    url
                );
            }
            RTCIceGathererEvent::OnLocalCandidate(Some(candidate), url) => {
                info!(
                    "({}) local candidate: {}{}",
                    self.label(),
                    candidate,
                    url.map(|url| format!(" via {url}")).unwrap_or_default()
                );
            }
            RTCIceGathererEvent::OnLocalCandidate(None, _) => {
                if self.state == SessionState::Gathering {
                    return self.on_gathering_complete();
                }
                warn!(
                    "({}) unexpected end of candidates in state {}",
                    self.label(),
                    self.state
                );
            }
        }
        Ok(())
    }

    fn on_ice_transport_event(&mut self, event: RTCIceTransportEvent) {
        match event {
            RTCIceTransportEvent::OnStateChange(state) => {
                info!("({}) ICE transport state: {}", self.label(), state);
            }
            RTCIceTransportEvent::OnSelectedCandidatePairChange(pair) => {
                info!("({}) selected candidate pair: {}", self.label(), pair);
            }
        }
    }

    fn on_dtls_transport_event(&mut self, event: RTCDtlsTransportEvent) -> Result<()> {
        match event {
            RTCDtlsTransportEvent::OnStateChange(state) => {
                info!("({}) DTLS transport state: {}", self.label(), state);
                if state == RTCDtlsTransportState::Connected
                    && self.state == SessionState::Negotiating
                {
                    self.state_change(SessionState::Connected);
                    let label = self.config.name();
                    if let Some(redirect) = self.redirect_transport.as_mut() {
                        checked(label, "start redirect transport", redirect.start())?;
                    }
                }
            }
            RTCDtlsTransportEvent::OnError(err) => {
                warn!("({}) DTLS transport error: {}", self.label(), err);
            }
        }
        Ok(())
    }

    /// Collects the local parameters once the end of candidates is reported
    /// and publishes them, then replays signaling lines that came in early.
    fn on_gathering_complete(&mut self) -> Result<()> {
        let label = self.config.name();
        let (Some(gatherer), Some(dtls_transport)) =
            (self.gatherer.as_deref(), self.dtls_transport.as_deref())
        else {
            return Err(Error::ErrSessionNotStarted);
        };

        let local_parameters = Parameters {
            ice_parameters: checked(
                label,
                "get local ICE parameters",
                gatherer.get_local_parameters(),
            )?,
            ice_candidates: checked(
                label,
                "get local ICE candidates",
                gatherer.get_local_candidates(),
            )?,
            dtls_parameters: checked(
                label,
                "get local DTLS parameters",
                dtls_transport.get_local_parameters(),
            )?,
        };
        self.local_parameters = Some(local_parameters);
        self.state_change(SessionState::LocalParamsReady);

        self.publish_local_parameters()?;
        self.state_change(SessionState::AwaitingRemote);

        while let Some(line) = self.pending.pop_front() {
            self.on_signaling_message(line)?;
        }
        Ok(())
    }

    fn publish_local_parameters(&mut self) -> Result<()> {
        let Some(local_parameters) = self.local_parameters.as_ref() else {
            return Ok(());
        };

        let document = match self.codec.encode_message(local_parameters) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    "({}) local parameters not published: {}",
                    self.config.name(),
                    err
                );
                return Ok(());
            }
        };

        info!("({}) publishing local parameters", self.config.name());
        checked(
            self.config.name(),
            "publish local parameters",
            self.signaling.publish(&document),
        )?;
        Ok(())
    }

    fn on_signaling_message(&mut self, line: Vec<u8>) -> Result<()> {
        if is_end_marker(&line) {
            info!("({}) end of session requested by signaling", self.label());
            return self.close();
        }

        match self.state {
            SessionState::Init
            | SessionState::CertificateReady
            | SessionState::Gathering
            | SessionState::LocalParamsReady => {
                debug!(
                    "({}) local parameters not ready, queueing remote message",
                    self.label()
                );
                self.pending.push_back(line);
                Ok(())
            }
            SessionState::AwaitingRemote => self.on_remote_message(&line),
            _ => {
                warn!(
                    "({}) ignoring remote message in state {}",
                    self.label(),
                    self.state
                );
                Ok(())
            }
        }
    }

    /// A message that fails to decode is dropped and the session keeps
    /// waiting for the next one.
    fn on_remote_message(&mut self, message: &[u8]) -> Result<()> {
        debug!(
            "({}) remote message: {}",
            self.label(),
            String::from_utf8_lossy(message).trim_end()
        );

        match self.codec.decode_line(message) {
            Ok(remote_parameters) => self.negotiate(remote_parameters),
            Err(err) => {
                warn!(
                    "({}) discarding remote parameters: {}",
                    self.label(),
                    err
                );
                Ok(())
            }
        }
    }

    fn negotiate(&mut self, remote_parameters: Parameters) -> Result<()> {
        let (Some(ice_parameters), Some(ice_candidates), Some(dtls_parameters)) = (
            remote_parameters.ice_parameters.as_ref(),
            remote_parameters.ice_candidates.as_ref(),
            remote_parameters.dtls_parameters.as_ref(),
        ) else {
            warn!("({}) remote parameters incomplete", self.label());
            return Ok(());
        };

        let label = self.config.name();
        let ice_role = self.config.ice_role();
        let (Some(gatherer), Some(ice_transport), Some(dtls_transport)) = (
            self.gatherer.as_deref(),
            self.ice_transport.as_deref_mut(),
            self.dtls_transport.as_deref_mut(),
        ) else {
            return Err(Error::ErrSessionNotStarted);
        };

        info!(
            "({}) remote parameters accepted, {} candidate(s), starting as {}",
            label,
            ice_candidates.len(),
            ice_role
        );
        checked(
            label,
            "set remote candidates",
            ice_transport.set_remote_candidates(ice_candidates),
        )?;
        checked(
            label,
            "start ICE transport",
            ice_transport.start(gatherer, ice_parameters, ice_role),
        )?;
        checked(
            label,
            "start DTLS transport",
            dtls_transport.start(dtls_parameters, ice_role),
        )?;

        self.remote_parameters = Some(remote_parameters);
        self.state_change(SessionState::Negotiating);
        Ok(())
    }

    /// Stops every transport and releases everything the session owns.
    /// Calling it again once closed does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        let result = self.shutdown();
        self.state_change(SessionState::Closed);
        result
    }

    /// Shuts down after a fatal error and returns the process exit status
    /// for it.
    pub fn fail(&mut self, err: Error) -> i32 {
        error!("({}) session failed: {}", self.label(), err);
        if let Err(close_err) = self.shutdown() {
            warn!("({}) shutdown after failure: {}", self.label(), close_err);
        }
        self.state_change(SessionState::Failed);
        err.exit_code()
    }

    /// Runs every stop even when an earlier one fails and reports the
    /// first failure.
    fn shutdown(&mut self) -> Result<()> {
        let label = self.config.name();
        let mut close_errs = vec![];

        if let Some(redirect_transport) = self.redirect_transport.as_mut() {
            if let Err(err) = checked(label, "stop redirect transport", redirect_transport.stop())
            {
                close_errs.push(err);
            }
        }
        if let Some(dtls_transport) = self.dtls_transport.as_mut() {
            if let Err(err) = checked(label, "stop DTLS transport", dtls_transport.stop()) {
                close_errs.push(err);
            }
        }
        if let Some(ice_transport) = self.ice_transport.as_mut() {
            if let Err(err) = checked(label, "stop ICE transport", ice_transport.stop()) {
                close_errs.push(err);
            }
        }
        if let Some(gatherer) = self.gatherer.as_mut() {
            if let Err(err) = checked(label, "close ICE gatherer", gatherer.close()) {
                close_errs.push(err);
            }
        }

        self.local_parameters = None;
        self.remote_parameters = None;
        self.pending.clear();

        self.redirect_transport = None;
        self.dtls_transport = None;
        self.ice_transport = None;
        self.gatherer = None;

        self.certificate = None;
        self.gather_options = None;

        match close_errs.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Classifies the outcome of a collaborator call. A call that is not
/// implemented is a warning and yields `None`, anything else is fatal and
/// logged with the caller's location.
#[track_caller]
fn checked<T>(label: &str, operation: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::ErrNotImplemented) => {
            warn!("({label}) {operation}: {}", Error::ErrNotImplemented);
            Ok(None)
        }
        Err(err) => {
            let location = Location::caller();
            error!(
                "({label}) {}:{} {operation} failed, code {}: {err}",
                location.file(),
                location.line(),
                err.exit_code()
            );
            Err(err)
        }
    }
}
