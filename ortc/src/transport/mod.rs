pub mod dtls;
pub mod ice;
pub mod redirect;

pub use dtls::DtlsTransport;
pub use ice::IceTransport;
pub use ice::gatherer::IceGatherer;
pub use redirect::RedirectTransport;
