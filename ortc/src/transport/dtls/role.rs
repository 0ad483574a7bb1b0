use std::fmt;

use serde::{Deserialize, Serialize};

/// RTCDtlsRole indicates the role of the DTLS transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsRole {
    #[default]
    Unspecified = 0,

    /// DTLSRoleAuto defines the DTLS role is determined based on
    /// the resolved ICE role: the ICE controlled role acts as the DTLS
    /// client and the ICE controlling role acts as the DTLS server.
    #[serde(rename = "auto")]
    Auto = 1,

    /// DTLSRoleClient defines the DTLS client role.
    #[serde(rename = "client")]
    Client = 2,

    /// DTLSRoleServer defines the DTLS server role.
    #[serde(rename = "server")]
    Server = 3,
}

const DTLS_ROLE_AUTO_STR: &str = "auto";
const DTLS_ROLE_CLIENT_STR: &str = "client";
const DTLS_ROLE_SERVER_STR: &str = "server";

impl From<&str> for RTCDtlsRole {
    fn from(raw: &str) -> Self {
        match raw {
            DTLS_ROLE_AUTO_STR => RTCDtlsRole::Auto,
            DTLS_ROLE_CLIENT_STR => RTCDtlsRole::Client,
            DTLS_ROLE_SERVER_STR => RTCDtlsRole::Server,
            _ => RTCDtlsRole::Unspecified,
        }
    }
}

impl fmt::Display for RTCDtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCDtlsRole::Auto => write!(f, "{DTLS_ROLE_AUTO_STR}"),
            RTCDtlsRole::Client => write!(f, "{DTLS_ROLE_CLIENT_STR}"),
            RTCDtlsRole::Server => write!(f, "{DTLS_ROLE_SERVER_STR}"),
            _ => write!(f, "{}", crate::configuration::UNSPECIFIED_STR),
        }
    }
}

/// <https://tools.ietf.org/html/rfc5763>
/// The answerer MUST use either a
/// setup attribute value of setup:active or setup:passive.  Note that
/// if the answerer uses setup:passive, then the DTLS handshake will
/// not begin until the answerer is received, which adds additional
/// latency. setup:active allows the answer and the DTLS handshake to
/// occur in parallel.  Thus, setup:active is RECOMMENDED.
pub(crate) const DEFAULT_DTLS_ROLE_ANSWER: RTCDtlsRole = RTCDtlsRole::Client;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dtls_role_string() {
        let tests = vec![
            (RTCDtlsRole::Unspecified, "Unspecified"),
            (RTCDtlsRole::Auto, "auto"),
            (RTCDtlsRole::Client, "client"),
            (RTCDtlsRole::Server, "server"),
        ];

        for (role, expected_string) in tests {
            assert_eq!(role.to_string(), expected_string)
        }
    }

    #[test]
    fn test_new_dtls_role() {
        let tests = vec![
            ("auto", RTCDtlsRole::Auto),
            ("client", RTCDtlsRole::Client),
            ("server", RTCDtlsRole::Server),
            ("actpass", RTCDtlsRole::Unspecified),
            ("", RTCDtlsRole::Unspecified),
        ];

        for (role_string, expected_role) in tests {
            assert_eq!(RTCDtlsRole::from(role_string), expected_role);
        }
    }
}
