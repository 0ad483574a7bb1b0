use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};

use crate::api::setting_engine::SettingEngine;
use crate::certificate::RTCCertificate;
use crate::transport::ice::role::RTCIceRole;
use parameters::RTCDtlsParameters;
use role::*;
use shared::error::{Error, Result};
use state::RTCDtlsTransportState;

pub mod fingerprint;
pub mod parameters;
pub mod role;
pub mod state;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCDtlsTransportEvent {
    OnStateChange(RTCDtlsTransportState),
    OnError(String),
}

/// Secures the path selected by the ICE transport.
pub trait DtlsTransport {
    fn get_local_parameters(&self) -> Result<RTCDtlsParameters>;
    fn start(&mut self, remote_parameters: &RTCDtlsParameters, ice_role: RTCIceRole)
    -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn state(&self) -> RTCDtlsTransportState;
    fn poll_event(&mut self) -> Option<RTCDtlsTransportEvent>;
}

/// DTLSTransport holds the local certificates and the negotiated remote
/// parameters. The handshake itself is driven by the DTLS endpoint once the
/// role has been resolved on start.
#[derive(Default)]
pub struct RTCDtlsTransport {
    pub(crate) certificates: Vec<RTCCertificate>,
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) remote_parameters: RTCDtlsParameters,
    pub(crate) ice_role: RTCIceRole,
    pub(crate) state: RTCDtlsTransportState,
    pub(crate) events: VecDeque<RTCDtlsTransportEvent>,
}

impl RTCDtlsTransport {
    pub(crate) fn new(certificates: Vec<RTCCertificate>, setting_engine: Arc<SettingEngine>) -> Self {
        RTCDtlsTransport {
            certificates,
            setting_engine,
            state: RTCDtlsTransportState::New,
            events: VecDeque::new(),
            ..Default::default()
        }
    }

    fn state_change(&mut self, state: RTCDtlsTransportState) {
        self.state = state;
        self.events
            .push_back(RTCDtlsTransportEvent::OnStateChange(state));
    }

    pub(crate) fn role(&self) -> RTCDtlsRole {
        // If remote has an explicit role use the inverse
        match self.remote_parameters.role {
            RTCDtlsRole::Client => return RTCDtlsRole::Server,
            RTCDtlsRole::Server => return RTCDtlsRole::Client,
            _ => {}
        };

        // If SettingEngine has an explicit role
        match self.setting_engine.answering_dtls_role {
            RTCDtlsRole::Server => return RTCDtlsRole::Server,
            RTCDtlsRole::Client => return RTCDtlsRole::Client,
            _ => {}
        };

        // Otherwise the ICE controlled side acts as the DTLS client
        match self.ice_role {
            RTCIceRole::Controlling => RTCDtlsRole::Server,
            RTCIceRole::Controlled => RTCDtlsRole::Client,
            RTCIceRole::Unspecified => DEFAULT_DTLS_ROLE_ANSWER,
        }
    }
}

impl DtlsTransport for RTCDtlsTransport {
    /// get_local_parameters returns the DTLS parameters of the local DTLSTransport upon construction.
    fn get_local_parameters(&self) -> Result<RTCDtlsParameters> {
        if self.certificates.is_empty() {
            return Err(Error::ErrNonCertificate);
        }

        let mut fingerprints = vec![];

        for c in &self.certificates {
            fingerprints.extend(c.get_fingerprints());
        }

        Ok(RTCDtlsParameters {
            role: RTCDtlsRole::Auto, // always returns the default role
            fingerprints,
        })
    }

    /// start DTLS transport negotiation with the parameters of the remote DTLS transport
    fn start(
        &mut self,
        remote_parameters: &RTCDtlsParameters,
        ice_role: RTCIceRole,
    ) -> Result<()> {
        if self.state != RTCDtlsTransportState::New {
            return Err(Error::ErrInvalidDTLSStart);
        }

        let certificate = self.certificates.first().ok_or(Error::ErrNonCertificate)?;
        if certificate.is_expired() {
            return Err(Error::ErrCertificateExpired);
        }

        for fingerprint in &remote_parameters.fingerprints {
            if !fingerprint.is_well_formed() {
                warn!("remote fingerprint does not match its algorithm: {fingerprint}");
                self.events.push_back(RTCDtlsTransportEvent::OnError(format!(
                    "malformed remote fingerprint {fingerprint}"
                )));
            }
        }

        self.remote_parameters = remote_parameters.clone();
        self.ice_role = ice_role;

        debug!("DTLS transport starting as {}", self.role());
        self.state_change(RTCDtlsTransportState::Connecting);

        Ok(())
    }

    /// stop the DTLSTransport object.
    fn stop(&mut self) -> Result<()> {
        if self.state == RTCDtlsTransportState::Closed {
            return Ok(());
        }
        self.state_change(RTCDtlsTransportState::Closed);
        Ok(())
    }

    /// state returns the current dtls_transport transport state.
    fn state(&self) -> RTCDtlsTransportState {
        self.state
    }

    fn poll_event(&mut self) -> Option<RTCDtlsTransportEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::dtls::fingerprint::{RTCDtlsFingerprint, RTCDtlsFingerprintAlgorithm};

    fn remote_parameters(role: RTCDtlsRole) -> RTCDtlsParameters {
        RTCDtlsParameters {
            role,
            fingerprints: vec![RTCDtlsFingerprint {
                algorithm: RTCDtlsFingerprintAlgorithm::Sha256,
                value: vec!["0a"; 32].join(":"),
            }],
        }
    }

    #[test]
    fn test_dtls_transport_local_parameters() -> Result<()> {
        let certificate = RTCCertificate::generate()?;
        let transport = RTCDtlsTransport::new(vec![certificate.clone()], Arc::default());

        let local = transport.get_local_parameters()?;
        assert_eq!(local.role, RTCDtlsRole::Auto);
        assert_eq!(local.fingerprints, certificate.get_fingerprints());

        let transport = RTCDtlsTransport::new(vec![], Arc::default());
        assert_eq!(
            transport.get_local_parameters(),
            Err(Error::ErrNonCertificate)
        );

        Ok(())
    }

    #[test]
    fn test_dtls_transport_role() -> Result<()> {
        let tests = vec![
            (RTCDtlsRole::Client, RTCIceRole::Controlled, RTCDtlsRole::Server),
            (RTCDtlsRole::Server, RTCIceRole::Controlling, RTCDtlsRole::Client),
            (RTCDtlsRole::Auto, RTCIceRole::Controlling, RTCDtlsRole::Server),
            (RTCDtlsRole::Auto, RTCIceRole::Controlled, RTCDtlsRole::Client),
        ];

        for (remote_role, ice_role, expected_role) in tests {
            let mut transport =
                RTCDtlsTransport::new(vec![RTCCertificate::generate()?], Arc::default());
            transport.start(&remote_parameters(remote_role), ice_role)?;
            assert_eq!(
                transport.role(),
                expected_role,
                "remote {remote_role}, ice {ice_role}"
            );
        }

        let mut setting_engine = SettingEngine::default();
        setting_engine.set_answering_dtls_role(RTCDtlsRole::Server)?;
        let mut transport =
            RTCDtlsTransport::new(vec![RTCCertificate::generate()?], Arc::new(setting_engine));
        transport.start(&remote_parameters(RTCDtlsRole::Auto), RTCIceRole::Controlled)?;
        assert_eq!(transport.role(), RTCDtlsRole::Server);

        Ok(())
    }

    #[test]
    fn test_dtls_transport_start() -> Result<()> {
        let mut transport = RTCDtlsTransport::new(vec![], Arc::default());
        assert_eq!(
            transport.start(&remote_parameters(RTCDtlsRole::Auto), RTCIceRole::Controlled),
            Err(Error::ErrNonCertificate)
        );

        let mut transport =
            RTCDtlsTransport::new(vec![RTCCertificate::generate()?], Arc::default());
        let mut remote = remote_parameters(RTCDtlsRole::Auto);
        remote.fingerprints[0].value = "ab:cd".to_owned();
        transport.start(&remote, RTCIceRole::Controlled)?;

        assert!(matches!(
            transport.poll_event(),
            Some(RTCDtlsTransportEvent::OnError(_))
        ));
        assert_eq!(
            transport.poll_event(),
            Some(RTCDtlsTransportEvent::OnStateChange(
                RTCDtlsTransportState::Connecting
            ))
        );
        assert_eq!(
            transport.start(&remote, RTCIceRole::Controlled),
            Err(Error::ErrInvalidDTLSStart)
        );

        transport.stop()?;
        transport.stop()?;
        assert_eq!(transport.state(), RTCDtlsTransportState::Closed);

        Ok(())
    }
}
