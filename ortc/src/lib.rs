//! # ORTC - Manual ICE/DTLS Negotiation
//!
//! Brings up an ICE path, secures it with DTLS and redirects the application
//! stream carried over it to a fixed address. Parameters are exchanged with
//! the remote peer by hand: each side prints one JSON line and the other side
//! pastes it in.
//!
//! ## Sans-I/O event flow
//!
//! The gatherer and transports never call back into the session. They queue
//! events, and the owner of the [`session::Session`] pumps them through a
//! single dispatch function together with the signaling lines it reads:
//!
//! ```no_run
//! use ortc::api::API;
//! use ortc::configuration::SessionConfigBuilder;
//! use ortc::session::{Session, SessionEvent};
//! use ortc::signaling::WriterSignaling;
//! use ortc::transport::ice::role::RTCIceRole;
//!
//! # fn example(remote_line: String) -> Result<(), ortc::shared::error::Error> {
//! let config = SessionConfigBuilder::new()
//!     .with_ice_role(RTCIceRole::Controlling)
//!     .build();
//! let mut session = Session::new(config, Box::new(WriterSignaling::new(std::io::stdout())));
//!
//! // Gathers candidates and publishes the local parameters once complete
//! session.start(&mut API::default())?;
//! session.drain_events()?;
//!
//! // Hand the remote peer's document to the session
//! session.handle_event(SessionEvent::Signaling(remote_line.into_bytes()))?;
//! session.drain_events()?;
//!
//! // A blank line, end of input or a termination signal closes the session
//! session.handle_event(SessionEvent::Terminate)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire format
//!
//! See [`parameters::codec::ParameterCodec`] for the signaling document and
//! the validation it performs.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub use shared;

pub mod api;
pub mod certificate;
pub mod configuration;
pub mod parameters;
pub mod session;
pub mod signaling;
pub mod transport;
