//! Knobs for the local collaborator set that fall outside the session
//! configuration exchanged with the peer.

use std::net::IpAddr;

use crate::transport::dtls::role::RTCDtlsRole;
use shared::error::{Error, Result};

#[derive(Default, Clone)]
pub struct Candidates {
    pub ice_lite: bool,
    /// Host addresses to gather on. The default route address is used when empty.
    pub interfaces: Vec<IpAddr>,
    pub username_fragment: String,
    pub password: String,
}

/// SettingEngine allows influencing behavior in ways that are not
/// supported by the signaled parameters.
#[derive(Default, Clone)]
pub struct SettingEngine {
    pub(crate) candidates: Candidates,
    pub(crate) answering_dtls_role: RTCDtlsRole,
}

impl SettingEngine {
    /// set_interfaces restricts host candidate gathering to the given addresses.
    pub fn set_interfaces(&mut self, interfaces: Vec<IpAddr>) {
        self.candidates.interfaces = interfaces;
    }

    /// set_lite configures whether or not the ice agent should be a lite agent
    pub fn set_lite(&mut self, lite: bool) {
        self.candidates.ice_lite = lite;
    }

    /// set_ice_credentials sets a staic uFrag/uPwd to be used by the gatherer.
    /// Random credentials are generated when either is empty.
    pub fn set_ice_credentials(&mut self, username_fragment: String, password: String) {
        self.candidates.username_fragment = username_fragment;
        self.candidates.password = password;
    }

    /// set_answering_dtls_role sets the DTLS role that is selected when the
    /// remote peer leaves the choice to us. Only Client and Server are accepted.
    pub fn set_answering_dtls_role(&mut self, role: RTCDtlsRole) -> Result<()> {
        if role != RTCDtlsRole::Client && role != RTCDtlsRole::Server {
            return Err(Error::ErrSettingEngineSetAnsweringDTLSRole);
        }

        self.answering_dtls_role = role;
        Ok(())
    }
}
