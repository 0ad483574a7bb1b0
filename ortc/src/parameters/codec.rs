use log::{debug, warn};
use serde_json::{Map, Value, json};

use super::Parameters;
use crate::transport::dtls::fingerprint::{RTCDtlsFingerprint, RTCDtlsFingerprintAlgorithm};
use crate::transport::dtls::parameters::RTCDtlsParameters;
use crate::transport::dtls::role::RTCDtlsRole;
use crate::transport::ice::candidate::{
    CandidateRelatedAddress, RTCIceCandidate, RTCIceTcpCandidateType,
};
use crate::transport::ice::candidate_type::RTCIceCandidateType;
use crate::transport::ice::parameters::RTCIceParameters;
use crate::transport::ice::protocol::RTCIceProtocol;
use shared::error::{Error, Result, flatten_errs};

/// Longest signaling document accepted, in bytes.
pub const PARAMETERS_MAX_LENGTH: usize = 8192;

const ICE_PARAMETERS_KEY: &str = "iceParameters";
const ICE_CANDIDATES_KEY: &str = "iceCandidates";
const DTLS_PARAMETERS_KEY: &str = "dtlsParameters";

const USERNAME_FRAGMENT_KEY: &str = "usernameFragment";
const PASSWORD_KEY: &str = "password";
const ICE_LITE_KEY: &str = "iceLite";

const FOUNDATION_KEY: &str = "foundation";
const PRIORITY_KEY: &str = "priority";
const IP_KEY: &str = "ip";
const PROTOCOL_KEY: &str = "protocol";
const PORT_KEY: &str = "port";
const TYPE_KEY: &str = "type";
const TCP_TYPE_KEY: &str = "tcpType";
const RELATED_ADDRESS_KEY: &str = "relatedAddress";
const RELATED_PORT_KEY: &str = "relatedPort";

const ROLE_KEY: &str = "role";
const FINGERPRINTS_KEY: &str = "fingerprints";
const ALGORITHM_KEY: &str = "algorithm";
const VALUE_KEY: &str = "value";

/// Where the decoder reads each fingerprint's `algorithm` and `value` from.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FingerprintLookup {
    /// Every fingerprint slot is filled from the `dtlsParameters` document
    /// itself, so all slots share one algorithm and value.
    #[default]
    Parent,
    /// Each slot is filled from its own element of `fingerprints`.
    Element,
}

/// Converts [`Parameters`] to and from the JSON signaling document:
///
/// ```text
/// {
///   "iceParameters": { "usernameFragment", "password", "iceLite" },
///   "iceCandidates": [ { "foundation", "priority", "ip", "protocol", "port",
///                        "type", "tcpType"?, "relatedAddress"?, "relatedPort"? } ],
///   "dtlsParameters": { "role", "fingerprints": [ { "algorithm", "value" } ] }
/// }
/// ```
///
/// Decoding runs every field check of a document, in a fixed order, before
/// deciding. A rejected document yields one [`Error::ErrDecode`] listing all
/// failed checks and no partially built value.
#[derive(Default, Debug, Clone)]
pub struct ParameterCodec {
    fingerprint_lookup: FingerprintLookup,
}

impl ParameterCodec {
    pub fn new(fingerprint_lookup: FingerprintLookup) -> Self {
        ParameterCodec { fingerprint_lookup }
    }

    pub fn fingerprint_lookup(&self) -> FingerprintLookup {
        self.fingerprint_lookup
    }

    /// Decodes a raw signaling line as read from the input, terminator
    /// included. Oversized and non UTF-8 lines are rejected before parsing.
    pub fn decode_line(&self, line: &[u8]) -> Result<Parameters> {
        let line = line
            .strip_suffix(b"\n")
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .unwrap_or(line);
        if line.len() > PARAMETERS_MAX_LENGTH {
            return Err(Error::ErrMessageTooLong(PARAMETERS_MAX_LENGTH));
        }
        self.decode_message(std::str::from_utf8(line)?)
    }

    /// Parses one signaling document and decodes all three parameter sections.
    pub fn decode_message(&self, message: &str) -> Result<Parameters> {
        if message.len() > PARAMETERS_MAX_LENGTH {
            return Err(Error::ErrMessageTooLong(PARAMETERS_MAX_LENGTH));
        }
        let doc: Value = serde_json::from_str(message)?;
        self.decode(&doc)
    }

    pub fn decode(&self, doc: &Value) -> Result<Parameters> {
        let mut errs = vec![];

        let ice_parameters = get_value(doc, "", ICE_PARAMETERS_KEY, &mut errs)
            .and_then(|v| collect(self.decode_ice_parameters(v), &mut errs));
        let ice_candidates = get_value(doc, "", ICE_CANDIDATES_KEY, &mut errs)
            .and_then(|v| collect(self.decode_ice_candidates(v), &mut errs));
        let dtls_parameters = get_value(doc, "", DTLS_PARAMETERS_KEY, &mut errs)
            .and_then(|v| collect(self.decode_dtls_parameters(v), &mut errs));

        flatten_errs(errs)?;

        Ok(Parameters {
            ice_parameters,
            ice_candidates,
            dtls_parameters,
        })
    }

    pub fn decode_ice_parameters(&self, doc: &Value) -> Result<RTCIceParameters> {
        let mut errs = vec![];
        let path = ICE_PARAMETERS_KEY;

        let username_fragment = get_str(doc, path, USERNAME_FRAGMENT_KEY, &mut errs);
        let password = get_str(doc, path, PASSWORD_KEY, &mut errs);
        let ice_lite = get_bool(doc, path, ICE_LITE_KEY, &mut errs);

        match (username_fragment, password, ice_lite) {
            (Some(username_fragment), Some(password), Some(ice_lite)) if errs.is_empty() => {
                Ok(RTCIceParameters {
                    username_fragment: username_fragment.to_owned(),
                    password: password.to_owned(),
                    ice_lite,
                })
            }
            _ => Err(Error::ErrDecode(errs)),
        }
    }

    /// Decodes a candidate list. Either every candidate is valid and the
    /// whole list is returned, or nothing is.
    pub fn decode_ice_candidates(&self, doc: &Value) -> Result<Vec<RTCIceCandidate>> {
        let Some(elements) = doc.as_array() else {
            return Err(Error::ErrDecode(vec![missing("", ICE_CANDIDATES_KEY)]));
        };

        let mut errs = vec![];
        let mut candidates = Vec::with_capacity(elements.len());

        for (i, element) in elements.iter().enumerate() {
            let path = format!("{ICE_CANDIDATES_KEY}[{i}]");

            let foundation = get_str(element, &path, FOUNDATION_KEY, &mut errs);
            let priority = get_u32(element, &path, PRIORITY_KEY, &mut errs);
            let address = get_str(element, &path, IP_KEY, &mut errs);
            let protocol = get_str(element, &path, PROTOCOL_KEY, &mut errs).and_then(|raw| {
                match RTCIceProtocol::from(raw) {
                    RTCIceProtocol::Unspecified => {
                        errs.push(Error::ErrICEProtocolUnknown(raw.to_owned()));
                        None
                    }
                    protocol => Some(protocol),
                }
            });
            let port = get_u16(element, &path, PORT_KEY, &mut errs);
            let typ = get_str(element, &path, TYPE_KEY, &mut errs).and_then(|raw| {
                match RTCIceCandidateType::from(raw) {
                    RTCIceCandidateType::Unspecified => {
                        errs.push(Error::ErrICECandidateTypeUnknown(raw.to_owned()));
                        None
                    }
                    typ => Some(typ),
                }
            });
            let tcp_type = if protocol == Some(RTCIceProtocol::Tcp) {
                get_str(element, &path, TCP_TYPE_KEY, &mut errs).and_then(|raw| {
                    match RTCIceTcpCandidateType::from(raw) {
                        RTCIceTcpCandidateType::Unspecified => {
                            errs.push(Error::ErrICETcpCandidateTypeUnknown(raw.to_owned()));
                            None
                        }
                        tcp_type => Some(tcp_type),
                    }
                })
            } else {
                Some(RTCIceTcpCandidateType::Active)
            };
            let related_address = decode_related_address(element, &path, typ);

            if let (
                Some(foundation),
                Some(priority),
                Some(address),
                Some(protocol),
                Some(port),
                Some(typ),
                Some(tcp_type),
            ) = (foundation, priority, address, protocol, port, typ, tcp_type)
            {
                candidates.push(RTCIceCandidate {
                    foundation: foundation.to_owned(),
                    priority,
                    address: address.to_owned(),
                    protocol,
                    port,
                    typ,
                    tcp_type,
                    related_address,
                });
            }
        }

        flatten_errs(errs)?;

        Ok(candidates)
    }

    /// Decodes DTLS parameters. A missing or unknown `role` falls back to
    /// `auto` with a warning instead of rejecting the document.
    pub fn decode_dtls_parameters(&self, doc: &Value) -> Result<RTCDtlsParameters> {
        let mut errs = vec![];
        let path = DTLS_PARAMETERS_KEY;

        let role = match doc
            .get(ROLE_KEY)
            .and_then(Value::as_str)
            .map(RTCDtlsRole::from)
        {
            None | Some(RTCDtlsRole::Unspecified) => {
                warn!("'{path}.{ROLE_KEY}' missing or invalid, using {}", RTCDtlsRole::Auto);
                RTCDtlsRole::Auto
            }
            Some(role) => role,
        };

        let mut fingerprints = vec![];
        if let Some(elements) = get_array(doc, path, FINGERPRINTS_KEY, &mut errs) {
            if elements.is_empty() {
                errs.push(Error::ErrNoFingerprints);
            }

            for (i, element) in elements.iter().enumerate() {
                let (source, source_path) = match self.fingerprint_lookup {
                    FingerprintLookup::Parent => (doc, path.to_owned()),
                    FingerprintLookup::Element => {
                        (element, format!("{path}.{FINGERPRINTS_KEY}[{i}]"))
                    }
                };

                let algorithm = get_str(source, &source_path, ALGORITHM_KEY, &mut errs)
                    .and_then(|raw| match RTCDtlsFingerprintAlgorithm::from(raw) {
                        RTCDtlsFingerprintAlgorithm::Unspecified => {
                            errs.push(Error::ErrUnsupportedFingerprintAlgorithm(raw.to_owned()));
                            None
                        }
                        algorithm => Some(algorithm),
                    });
                let value = get_str(source, &source_path, VALUE_KEY, &mut errs);

                if let (Some(algorithm), Some(value)) = (algorithm, value) {
                    fingerprints.push(RTCDtlsFingerprint {
                        algorithm,
                        value: value.to_owned(),
                    });
                }
            }
        }

        flatten_errs(errs)?;

        Ok(RTCDtlsParameters { role, fingerprints })
    }

    /// Encodes complete parameters as a single-line JSON document.
    pub fn encode_message(&self, parameters: &Parameters) -> Result<String> {
        Ok(serde_json::to_string(&self.encode(parameters)?)?)
    }

    pub fn encode(&self, parameters: &Parameters) -> Result<Value> {
        let ice_parameters = parameters
            .ice_parameters
            .as_ref()
            .ok_or_else(|| Error::ErrParametersIncomplete(ICE_PARAMETERS_KEY.to_owned()))?;
        let ice_candidates = parameters
            .ice_candidates
            .as_ref()
            .ok_or_else(|| Error::ErrParametersIncomplete(ICE_CANDIDATES_KEY.to_owned()))?;
        let dtls_parameters = parameters
            .dtls_parameters
            .as_ref()
            .ok_or_else(|| Error::ErrParametersIncomplete(DTLS_PARAMETERS_KEY.to_owned()))?;

        Ok(json!({
            ICE_PARAMETERS_KEY: self.encode_ice_parameters(ice_parameters)?,
            ICE_CANDIDATES_KEY: self.encode_ice_candidates(ice_candidates),
            DTLS_PARAMETERS_KEY: self.encode_dtls_parameters(dtls_parameters)?,
        }))
    }

    pub fn encode_ice_parameters(&self, ice_parameters: &RTCIceParameters) -> Result<Value> {
        Ok(serde_json::to_value(ice_parameters)?)
    }

    pub fn encode_ice_candidates(&self, ice_candidates: &[RTCIceCandidate]) -> Value {
        Value::Array(ice_candidates.iter().map(encode_ice_candidate).collect())
    }

    /// The first fingerprint is mirrored at the top level so the document
    /// decodes the same under either [`FingerprintLookup`]. With
    /// [`FingerprintLookup::Parent`] a list of differing fingerprints has no
    /// faithful encoding and is refused.
    pub fn encode_dtls_parameters(&self, dtls_parameters: &RTCDtlsParameters) -> Result<Value> {
        if self.fingerprint_lookup == FingerprintLookup::Parent
            && dtls_parameters
                .fingerprints
                .windows(2)
                .any(|pair| pair[0] != pair[1])
        {
            return Err(Error::ErrFingerprintsDiverge);
        }

        let mut doc = Map::new();
        doc.insert(ROLE_KEY.to_owned(), json!(dtls_parameters.role.to_string()));
        if let Some(first) = dtls_parameters.fingerprints.first() {
            doc.insert(ALGORITHM_KEY.to_owned(), json!(first.algorithm.to_string()));
            doc.insert(VALUE_KEY.to_owned(), json!(first.value));
        }
        let fingerprints: Vec<Value> = dtls_parameters
            .fingerprints
            .iter()
            .map(|fingerprint| {
                json!({
                    ALGORITHM_KEY: fingerprint.algorithm.to_string(),
                    VALUE_KEY: fingerprint.value,
                })
            })
            .collect();
        doc.insert(FINGERPRINTS_KEY.to_owned(), Value::Array(fingerprints));
        Ok(Value::Object(doc))
    }
}

fn encode_ice_candidate(candidate: &RTCIceCandidate) -> Value {
    let mut doc = Map::new();
    doc.insert(FOUNDATION_KEY.to_owned(), json!(candidate.foundation));
    doc.insert(PRIORITY_KEY.to_owned(), json!(candidate.priority));
    doc.insert(IP_KEY.to_owned(), json!(candidate.address));
    doc.insert(PROTOCOL_KEY.to_owned(), json!(candidate.protocol.to_string()));
    doc.insert(PORT_KEY.to_owned(), json!(candidate.port));
    doc.insert(TYPE_KEY.to_owned(), json!(candidate.typ.to_string()));
    if candidate.protocol == RTCIceProtocol::Tcp {
        doc.insert(TCP_TYPE_KEY.to_owned(), json!(candidate.tcp_type.to_string()));
    }
    if let Some(related_address) = &candidate.related_address {
        doc.insert(
            RELATED_ADDRESS_KEY.to_owned(),
            json!(related_address.address),
        );
        doc.insert(RELATED_PORT_KEY.to_owned(), json!(related_address.port));
    }
    Value::Object(doc)
}

/// Related address and port never reject a candidate. They are kept only
/// when both are present and well-typed, and never for host candidates.
fn decode_related_address(
    element: &Value,
    path: &str,
    typ: Option<RTCIceCandidateType>,
) -> Option<CandidateRelatedAddress> {
    let address = element.get(RELATED_ADDRESS_KEY).and_then(Value::as_str);
    let port = element
        .get(RELATED_PORT_KEY)
        .and_then(Value::as_u64)
        .and_then(|port| u16::try_from(port).ok());

    match (address, port) {
        (Some(address), Some(port)) if typ != Some(RTCIceCandidateType::Host) => {
            Some(CandidateRelatedAddress {
                address: address.to_owned(),
                port,
            })
        }
        (None, None) => None,
        _ => {
            debug!("'{path}': ignoring related address");
            None
        }
    }
}

/// Moves the checks of a nested decode into `errs`, keeping their order.
fn collect<T>(result: Result<T>, errs: &mut Vec<Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(Error::ErrDecode(nested)) => {
            errs.extend(nested);
            None
        }
        Err(err) => {
            errs.push(err);
            None
        }
    }
}

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

fn missing(path: &str, key: &str) -> Error {
    let field = field_path(path, key);
    debug!("'{field}' missing or of wrong type");
    Error::ErrMissingOrWrongType(field)
}

fn get_value<'a>(doc: &'a Value, path: &str, key: &str, errs: &mut Vec<Error>) -> Option<&'a Value> {
    let value = doc.get(key);
    if value.is_none() {
        errs.push(missing(path, key));
    }
    value
}

fn get_str<'a>(doc: &'a Value, path: &str, key: &str, errs: &mut Vec<Error>) -> Option<&'a str> {
    let value = doc.get(key).and_then(Value::as_str);
    if value.is_none() {
        errs.push(missing(path, key));
    }
    value
}

fn get_bool(doc: &Value, path: &str, key: &str, errs: &mut Vec<Error>) -> Option<bool> {
    let value = doc.get(key).and_then(Value::as_bool);
    if value.is_none() {
        errs.push(missing(path, key));
    }
    value
}

fn get_array<'a>(
    doc: &'a Value,
    path: &str,
    key: &str,
    errs: &mut Vec<Error>,
) -> Option<&'a Vec<Value>> {
    let value = doc.get(key).and_then(Value::as_array);
    if value.is_none() {
        errs.push(missing(path, key));
    }
    value
}

/// Reads a non-negative integer no larger than `max`. Negative numbers are
/// out of range, fractional numbers have the wrong type.
fn get_uint(doc: &Value, path: &str, key: &str, max: u64, errs: &mut Vec<Error>) -> Option<u64> {
    match doc.get(key) {
        Some(Value::Number(number)) => match number.as_u64() {
            Some(value) if value <= max => Some(value),
            Some(_) => {
                errs.push(Error::ErrValueOutOfRange(field_path(path, key)));
                None
            }
            None if number.is_i64() => {
                errs.push(Error::ErrValueOutOfRange(field_path(path, key)));
                None
            }
            None => {
                errs.push(missing(path, key));
                None
            }
        },
        _ => {
            errs.push(missing(path, key));
            None
        }
    }
}

fn get_u32(doc: &Value, path: &str, key: &str, errs: &mut Vec<Error>) -> Option<u32> {
    get_uint(doc, path, key, u64::from(u32::MAX), errs).and_then(|v| u32::try_from(v).ok())
}

fn get_u16(doc: &Value, path: &str, key: &str, errs: &mut Vec<Error>) -> Option<u16> {
    get_uint(doc, path, key, u64::from(u16::MAX), errs).and_then(|v| u16::try_from(v).ok())
}
