//! Parameter bags exchanged between peers and their JSON wire codec.


pub mod codec;

use crate::transport::dtls::parameters::RTCDtlsParameters;
use crate::transport::ice::candidate::RTCIceCandidate;
use crate::transport::ice::parameters::RTCIceParameters;

/// Everything one peer has to tell the other to set up its transports.
///
/// Each part is filled in independently: local parameters once gathering
/// completes, remote parameters only from a fully decoded signaling document.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub ice_parameters: Option<RTCIceParameters>,
    pub ice_candidates: Option<Vec<RTCIceCandidate>>,
    pub dtls_parameters: Option<RTCDtlsParameters>,
}

impl Parameters {
    pub fn is_complete(&self) -> bool {
        self.ice_parameters.is_some()
            && self.ice_candidates.is_some()
            && self.dtls_parameters.is_some()
    }
}
