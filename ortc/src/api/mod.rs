pub mod setting_engine;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::certificate::{CertificateProvisioner, RTCCertificate};
use crate::transport::dtls::RTCDtlsTransport;
use crate::transport::ice::RTCIceTransport;
use crate::transport::ice::gatherer::{RTCIceGatherOptions, RTCIceGatherer};
use crate::transport::redirect::RTCRedirectTransport;
use crate::transport::{DtlsTransport, IceGatherer, IceTransport, RedirectTransport};
use setting_engine::SettingEngine;
use shared::error::Result;

/// Creates the collaborators a session drives.
pub trait TransportFactory: CertificateProvisioner {
    fn new_ice_gatherer(&mut self, options: &RTCIceGatherOptions) -> Result<Box<dyn IceGatherer>>;
    fn new_ice_transport(&mut self) -> Result<Box<dyn IceTransport>>;
    fn new_dtls_transport(
        &mut self,
        certificates: Vec<RTCCertificate>,
    ) -> Result<Box<dyn DtlsTransport>>;
    fn new_redirect_transport(&mut self, address: SocketAddr)
    -> Result<Box<dyn RedirectTransport>>;
}

/// API bundles the global functions of the ORTC API.
#[derive(Default)]
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
}

impl API {
    pub fn new(setting_engine: SettingEngine) -> Self {
        API {
            setting_engine: Arc::new(setting_engine),
        }
    }
}

impl CertificateProvisioner for API {
    fn generate_certificate(&mut self) -> Result<RTCCertificate> {
        RTCCertificate::generate()
    }
}

impl TransportFactory for API {
    /// new_ice_gatherer creates a new ice gatherer.
    fn new_ice_gatherer(&mut self, options: &RTCIceGatherOptions) -> Result<Box<dyn IceGatherer>> {
        Ok(Box::new(RTCIceGatherer::new(
            options,
            Arc::clone(&self.setting_engine),
        )))
    }

    /// new_ice_transport creates a new ice transport.
    fn new_ice_transport(&mut self) -> Result<Box<dyn IceTransport>> {
        Ok(Box::new(RTCIceTransport::new()))
    }

    /// new_dtls_transport creates a new dtls_transport transport.
    fn new_dtls_transport(
        &mut self,
        certificates: Vec<RTCCertificate>,
    ) -> Result<Box<dyn DtlsTransport>> {
        Ok(Box::new(RTCDtlsTransport::new(
            certificates,
            Arc::clone(&self.setting_engine),
        )))
    }

    fn new_redirect_transport(
        &mut self,
        address: SocketAddr,
    ) -> Result<Box<dyn RedirectTransport>> {
        Ok(Box::new(RTCRedirectTransport::new(address)))
    }
}
