#![allow(dead_code)]

use std::io;
use std::net;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Process exit status for a graceful shutdown.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit status for bad command-line arguments.
pub const EXIT_USAGE: i32 = 1;
/// Process exit status for an unrecoverable internal fault.
pub const EXIT_FAULT: i32 = 2;

const EXIT_NOT_IMPLEMENTED: i32 = 3;
const EXIT_INVALID_ARGUMENT: i32 = 4;
const EXIT_INVALID_STATE: i32 = 5;
const EXIT_INVALID_CERTIFICATE: i32 = 6;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //Usage errors
    #[error("usage: {0}")]
    ErrUsage(String),
    #[error("invalid port number")]
    ErrInvalidPortNumber,

    //Collaborator errors
    #[error("feature has not been implemented yet")]
    ErrNotImplemented,
    #[error("unknown ICE Role")]
    ErrICERoleUnknown,
    #[error("gatherer not started")]
    ErrICEGathererNotStarted,
    #[error("gatherer already started")]
    ErrICEGathererAlreadyStarted,
    #[error("gatherer is closed")]
    ErrICEGathererClosed,
    #[error("ICETransport can only be called in ICETransportStateNew")]
    ErrICETransportNotInNew,
    #[error("attempted to start DTLSTransport that is not in new state")]
    ErrInvalidDTLSStart,
    #[error("attempted to start RedirectTransport that is not in new state")]
    ErrInvalidRedirectStart,
    /// ErrNonCertificate indicates that there is no certificate
    #[error("no certificate")]
    ErrNonCertificate,
    #[error("x509Cert expired")]
    ErrCertificateExpired,
    #[error("set_answering_dtls_role must DTLSRoleClient or DTLSRoleServer")]
    ErrSettingEngineSetAnsweringDTLSRole,
    #[error("session transports have not been created")]
    ErrSessionNotStarted,
    #[error("session transports have already been created")]
    ErrSessionAlreadyStarted,

    //Parameter errors
    #[error("'{0}' missing or of wrong type")]
    ErrMissingOrWrongType(String),
    #[error("'{0}' out of range")]
    ErrValueOutOfRange(String),
    #[error("unknown protocol: {0}")]
    ErrICEProtocolUnknown(String),
    #[error("unknown candidate type: {0}")]
    ErrICECandidateTypeUnknown(String),
    #[error("unknown TCP candidate type: {0}")]
    ErrICETcpCandidateTypeUnknown(String),
    #[error("unsupported fingerprint algorithm: {0}")]
    ErrUnsupportedFingerprintAlgorithm(String),
    #[error("DTLS parameters require at least one fingerprint")]
    ErrNoFingerprints,
    #[error("'{0}' not available in local parameters")]
    ErrParametersIncomplete(String),
    #[error("message exceeds {0} bytes")]
    ErrMessageTooLong(usize),
    #[error("fingerprints differ but the parent document holds only one")]
    ErrFingerprintsDiverge,
    #[error("invalid parameters: {}", join_errs(.0))]
    ErrDecode(Vec<Error>),

    #[error("json: {0}")]
    Json(String),
    #[error("{0}")]
    RcGen(#[from] rcgen::Error),
    #[error("utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("parse ip: {0}")]
    ParseIp(#[from] net::AddrParseError),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit status derived from this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ErrUsage(_)
            | Error::ErrInvalidPortNumber
            | Error::ParseIp(_) => EXIT_USAGE,

            Error::ErrNotImplemented => EXIT_NOT_IMPLEMENTED,

            Error::ErrICERoleUnknown
            | Error::ErrSettingEngineSetAnsweringDTLSRole
            | Error::ErrMissingOrWrongType(_)
            | Error::ErrValueOutOfRange(_)
            | Error::ErrICEProtocolUnknown(_)
            | Error::ErrICECandidateTypeUnknown(_)
            | Error::ErrICETcpCandidateTypeUnknown(_)
            | Error::ErrUnsupportedFingerprintAlgorithm(_)
            | Error::ErrNoFingerprints
            | Error::ErrParametersIncomplete(_)
            | Error::ErrMessageTooLong(_)
            | Error::ErrFingerprintsDiverge
            | Error::ErrDecode(_)
            | Error::Json(_)
            | Error::Utf8(_) => EXIT_INVALID_ARGUMENT,

            Error::ErrICEGathererNotStarted
            | Error::ErrICEGathererAlreadyStarted
            | Error::ErrICEGathererClosed
            | Error::ErrICETransportNotInNew
            | Error::ErrInvalidDTLSStart
            | Error::ErrInvalidRedirectStart
            | Error::ErrSessionNotStarted
            | Error::ErrSessionAlreadyStarted => EXIT_INVALID_STATE,

            Error::ErrNonCertificate | Error::ErrCertificateExpired | Error::RcGen(_) => {
                EXIT_INVALID_CERTIFICATE
            }

            Error::Io(IoError(e)) => e.raw_os_error().filter(|c| *c > 0).unwrap_or(EXIT_FAULT),

            Error::Other(_) => EXIT_FAULT,
        }
    }
}

fn join_errs(errs: &[Error]) -> String {
    let errs_strs: Vec<String> = errs.iter().map(|e| e.to_string()).collect();
    errs_strs.join("; ")
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one, keeping the order the
/// checks ran in.
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        Err(Error::ErrDecode(errs.into_iter().map(|e| e.into()).collect()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flatten_errs() {
        assert_eq!(flatten_errs(Vec::<Error>::new()), Ok(()));

        let result = flatten_errs(vec![
            Error::ErrMissingOrWrongType("foundation".to_owned()),
            Error::ErrICEProtocolUnknown("sctp".to_owned()),
        ]);
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameters: 'foundation' missing or of wrong type; unknown protocol: sctp"
        );
    }

    #[test]
    fn test_exit_code() {
        let tests = vec![
            (Error::ErrUsage("bad role".to_owned()), EXIT_USAGE),
            (Error::ErrInvalidPortNumber, EXIT_USAGE),
            (Error::Other("no memory".to_owned()), EXIT_FAULT),
            (Error::ErrNotImplemented, EXIT_NOT_IMPLEMENTED),
            (Error::ErrDecode(vec![]), EXIT_INVALID_ARGUMENT),
            (
                Error::from(std::str::from_utf8(&[0xff, 0xfe]).unwrap_err()),
                EXIT_INVALID_ARGUMENT,
            ),
            (Error::ErrInvalidDTLSStart, EXIT_INVALID_STATE),
            (Error::ErrNonCertificate, EXIT_INVALID_CERTIFICATE),
            (
                Error::from(io::Error::from_raw_os_error(13)),
                13, /* EACCES */
            ),
            (
                Error::from(io::Error::new(io::ErrorKind::Other, "custom")),
                EXIT_FAULT,
            ),
        ];

        for (err, expected) in tests {
            assert_eq!(err.exit_code(), expected, "{err}");
        }
    }
}
