use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::transport::ice::gatherer::{RTCIceGatherOptions, RTCIceGatherPolicy};
use crate::transport::ice::role::RTCIceRole;
use crate::transport::ice::server::RTCIceServer;
use shared::error::{Error, Result};
use shared::util::parse_port;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Label used in log lines when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "A";

/// STUN and TURN servers offered to the gatherer when none are configured.
pub fn default_ice_servers() -> Vec<RTCIceServer> {
    vec![
        RTCIceServer::new(vec!["stun:stun.l.google.com:19302".to_owned()]),
        RTCIceServer::new(vec!["stun:stun1.l.google.com:19302".to_owned()]),
        RTCIceServer::with_password_credential(
            vec!["turn:turn.zwuenf.org".to_owned()],
            "bruno",
            "onurb",
        ),
    ]
}

/// Parses the command-line ICE role: `0` is controlled, `1` controlling.
pub fn parse_ice_role(raw: &str) -> Result<RTCIceRole> {
    match raw {
        "0" => Ok(RTCIceRole::Controlled),
        "1" => Ok(RTCIceRole::Controlling),
        role => Err(Error::ErrUsage(format!("invalid role '{role}'"))),
    }
}

/// Parses the address the secured stream is redirected to.
pub fn parse_redirect_address(ip: &str, port: &str) -> Result<SocketAddr> {
    let ip: IpAddr = ip.parse()?;
    Ok(SocketAddr::new(ip, parse_port(port)?))
}

/// SessionConfig defines how a session negotiates with its peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub(crate) name: String,
    pub(crate) ice_role: RTCIceRole,
    pub(crate) redirect_address: SocketAddr,
    pub(crate) gather_options: RTCIceGatherOptions,
}

impl SessionConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ice_role(&self) -> RTCIceRole {
        self.ice_role
    }

    pub fn redirect_address(&self) -> SocketAddr {
        self.redirect_address
    }

    pub fn gather_options(&self) -> &RTCIceGatherOptions {
        &self.gather_options
    }
}

pub struct SessionConfigBuilder {
    pub(crate) name: String,
    pub(crate) ice_role: RTCIceRole,
    pub(crate) redirect_address: SocketAddr,
    pub(crate) ice_servers: Vec<RTCIceServer>,
    pub(crate) ice_gather_policy: RTCIceGatherPolicy,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        SessionConfigBuilder {
            name: DEFAULT_SESSION_NAME.to_owned(),
            ice_role: RTCIceRole::Controlled,
            redirect_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            ice_servers: default_ice_servers(),
            ice_gather_policy: RTCIceGatherPolicy::All,
        }
    }
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        SessionConfigBuilder::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ice_role(mut self, ice_role: RTCIceRole) -> Self {
        self.ice_role = ice_role;
        self
    }

    pub fn with_redirect_address(mut self, redirect_address: SocketAddr) -> Self {
        self.redirect_address = redirect_address;
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<RTCIceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_ice_gather_policy(mut self, ice_gather_policy: RTCIceGatherPolicy) -> Self {
        self.ice_gather_policy = ice_gather_policy;
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            name: self.name,
            ice_role: self.ice_role,
            redirect_address: self.redirect_address,
            gather_options: RTCIceGatherOptions {
                ice_servers: self.ice_servers,
                ice_gather_policy: self.ice_gather_policy,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::ice::server::RTCIceCredentialType;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfigBuilder::new().build();

        assert_eq!(config.name(), "A");
        assert_eq!(config.ice_role(), RTCIceRole::Controlled);
        assert_eq!(config.gather_options().ice_gather_policy, RTCIceGatherPolicy::All);

        let servers = &config.gather_options().ice_servers;
        assert_eq!(servers.len(), 3);
        assert_eq!(servers[0].urls, vec!["stun:stun.l.google.com:19302"]);
        assert_eq!(servers[1].urls, vec!["stun:stun1.l.google.com:19302"]);
        assert_eq!(servers[2].urls, vec!["turn:turn.zwuenf.org"]);
        assert_eq!(servers[2].credential_type, RTCIceCredentialType::Password);
        assert_eq!(servers[2].username, "bruno");
    }

    #[test]
    fn test_parse_ice_role() {
        let tests = vec![
            ("0", Ok(RTCIceRole::Controlled)),
            ("1", Ok(RTCIceRole::Controlling)),
            ("2", Err(Error::ErrUsage("invalid role '2'".to_owned()))),
            ("", Err(Error::ErrUsage("invalid role ''".to_owned()))),
            (
                "controlling",
                Err(Error::ErrUsage("invalid role 'controlling'".to_owned())),
            ),
        ];

        for (raw, expected) in tests {
            assert_eq!(parse_ice_role(raw), expected, "{raw:?}");
        }
    }

    #[test]
    fn test_parse_redirect_address() {
        assert_eq!(
            parse_redirect_address("127.0.0.1", "5000"),
            Ok(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 5000))
        );
        assert_eq!(
            parse_redirect_address("::1", "0").map(|address| address.is_ipv6()),
            Ok(true)
        );

        let tests = vec![
            ("127.0.0.1", "9:"),
            ("127.0.0.1", "65536"),
            ("127.0.0.1", "-1"),
            ("localhost", "5000"),
            ("1.2.3", "5000"),
        ];
        for (ip, port) in tests {
            let err = parse_redirect_address(ip, port).unwrap_err();
            assert_eq!(err.exit_code(), shared::error::EXIT_USAGE, "{ip} {port}: {err}");
        }
    }

    #[test]
    fn test_session_config_builder() {
        let redirect_address: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let config = SessionConfigBuilder::new()
            .with_name("B")
            .with_ice_role(RTCIceRole::Controlling)
            .with_redirect_address(redirect_address)
            .with_ice_servers(vec![])
            .with_ice_gather_policy(RTCIceGatherPolicy::Relay)
            .build();

        assert_eq!(config.name(), "B");
        assert_eq!(config.ice_role(), RTCIceRole::Controlling);
        assert_eq!(config.redirect_address(), redirect_address);
        assert!(config.gather_options().ice_servers.is_empty());
        assert_eq!(
            config.gather_options().ice_gather_policy,
            RTCIceGatherPolicy::Relay
        );
    }
}
