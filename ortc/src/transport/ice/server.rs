use std::fmt;

use serde::{Deserialize, Serialize};

/// ICECredentialType indicates the type of credentials used to connect to
/// an ICE server.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCIceCredentialType {
    /// ICECredentialTypeNone indicates the server needs no credential.
    #[default]
    #[serde(rename = "none")]
    None,

    /// ICECredentialTypePassword describes username and password based
    /// credentials as described in <https://tools.ietf.org/html/rfc5389>.
    #[serde(rename = "password")]
    Password,
}

impl fmt::Display for RTCIceCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCIceCredentialType::None => write!(f, "none"),
            RTCIceCredentialType::Password => write!(f, "password"),
        }
    }
}

/// ICEServer describes a single STUN and TURN server that can be used by
/// the ICEAgent to establish a connection with a peer.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
    pub credential_type: RTCIceCredentialType,
}

impl RTCIceServer {
    pub fn new(urls: Vec<String>) -> Self {
        RTCIceServer {
            urls,
            ..Default::default()
        }
    }

    pub fn with_password_credential(
        urls: Vec<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        RTCIceServer {
            urls,
            username: username.into(),
            credential: credential.into(),
            credential_type: RTCIceCredentialType::Password,
        }
    }

    /// Whether any of the URLs targets a TURN server.
    pub fn is_turn(&self) -> bool {
        self.urls
            .iter()
            .any(|url| url.starts_with("turn:") || url.starts_with("turns:"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_server_kind() {
        let tests = vec![
            (
                RTCIceServer::new(vec!["stun:stun.l.google.com:19302".to_owned()]),
                false,
            ),
            (
                RTCIceServer::with_password_credential(
                    vec!["turn:192.158.29.39?transport=udp".to_owned()],
                    "unittest",
                    "placeholder",
                ),
                true,
            ),
            (
                RTCIceServer::new(vec!["turns:turn.example.org".to_owned()]),
                true,
            ),
        ];

        for (server, expected_turn) in tests {
            assert_eq!(server.is_turn(), expected_turn, "{:?}", server.urls);
        }
    }

    #[test]
    fn test_password_credential() {
        let server =
            RTCIceServer::with_password_credential(vec!["turn:turn.example.org".to_owned()], "u", "p");
        assert_eq!(server.credential_type, RTCIceCredentialType::Password);
        assert_eq!(server.username, "u");
        assert_eq!(server.credential, "p");
    }
}
