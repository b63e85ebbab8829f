//! UDS (ISO 14229) service engine: request byte layouts, response
//! classification, and DTC record parsing.
//!
//! Individual service request builders live under [request].

pub mod request;

/// UDS service identifiers this core builds requests for and recognises in
/// responses
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum UdsServiceId {
    /// `0x10`
    DiagnosticSessionControl = 0x10,
    /// `0x11`
    EcuReset = 0x11,
    /// `0x14`
    ClearDiagnosticInformation = 0x14,
    /// `0x19`
    ReadDtcInformation = 0x19,
    /// `0x22`
    ReadDataByIdentifier = 0x22,
    /// `0x27`
    SecurityAccess = 0x27,
    /// `0x28`
    CommunicationControl = 0x28,
    /// `0x2E`
    WriteDataByIdentifier = 0x2E,
    /// `0x31`
    RoutineControl = 0x31,
    /// `0x3E`
    TesterPresent = 0x3E,
}

impl UdsServiceId {
    /// Raw wire value of this service id
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Positive-response service id (`self + 0x40`)
    pub fn positive_response_id(self) -> u8 {
        self.as_u8() + 0x40
    }
}

/// One outbound UDS request: a service id and its body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdsRequest {
    /// Requested service id
    pub service_id: u8,
    /// Request body, excluding the service id byte
    pub body: Vec<u8>,
}

impl UdsRequest {
    /// Builds a request from a service id and body
    pub fn new(service_id: u8, body: Vec<u8>) -> Self {
        Self { service_id, body }
    }

    /// Serialises this request to the bytes transmitted on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.body.len());
        out.push(self.service_id);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Classified UDS response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdsResponse {
    /// Service accepted: `service_id + 0x40` followed by `body`
    Positive {
        /// Service id that was requested
        service_id: u8,
        /// Response body, excluding the echoed service id
        body: Vec<u8>,
        /// Complete raw payload as received
        raw: Vec<u8>,
    },
    /// Service refused: `0x7F`, echoed service id, and an NRC byte
    Negative {
        /// Service id that was requested (echoed by the ECU)
        service_id: u8,
        /// Reason for refusal
        code: NegativeResponseCode,
        /// Complete raw payload as received
        raw: Vec<u8>,
    },
}

/// Negative response code (NRC): the reason byte an ECU attaches to a `0x7F`
/// response
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NegativeResponseCode {
    /// `0x10` - ECU rejected the request with no specific reason
    GeneralReject,
    /// `0x11` - service is not supported by the ECU
    ServiceNotSupported,
    /// `0x12` - sub-function is not supported by the ECU
    SubFunctionNotSupported,
    /// `0x13` - request length or format was invalid
    IncorrectMessageLengthOrInvalidFormat,
    /// `0x14` - the response would be too long for the transport
    ResponseTooLong,
    /// `0x21` - ECU is busy; the request should be repeated
    BusyRepeatRequest,
    /// `0x22` - prerequisite conditions for the request are not met
    ConditionsNotCorrect,
    /// `0x24` - request was sent out of the required order
    RequestSequenceError,
    /// `0x31` - request data is outside a valid range
    RequestOutOfRange,
    /// `0x33` - security access was denied
    SecurityAccessDenied,
    /// `0x35` - the key sent to the ECU was incorrect
    InvalidKey,
    /// `0x36` - too many incorrect key attempts
    ExceededNumberOfAttempts,
    /// `0x37` - a required cooldown period has not yet elapsed
    RequiredTimeDelayNotExpired,
    /// `0x78` - the ECU accepted the request but needs more time; consumed
    /// internally by [crate::client::UdsClient] and never surfaced to a
    /// caller as this variant
    RequestCorrectlyReceivedResponsePending,
    /// `0x7E` - sub-function is not supported in the active diagnostic session
    SubFunctionNotSupportedInActiveSession,
    /// `0x7F` - service is not supported in the active diagnostic session
    ServiceNotSupportedInActiveSession,
    /// `0x80..=0xFF` - manufacturer-specific NRC
    VendorSpecific(u8),
    /// Any NRC byte ISO 14229 defines but this catalogue does not name
    /// explicitly
    Other(u8),
}

impl From<u8> for NegativeResponseCode {
    fn from(raw: u8) -> Self {
        match raw {
            0x10 => NegativeResponseCode::GeneralReject,
            0x11 => NegativeResponseCode::ServiceNotSupported,
            0x12 => NegativeResponseCode::SubFunctionNotSupported,
            0x13 => NegativeResponseCode::IncorrectMessageLengthOrInvalidFormat,
            0x14 => NegativeResponseCode::ResponseTooLong,
            0x21 => NegativeResponseCode::BusyRepeatRequest,
            0x22 => NegativeResponseCode::ConditionsNotCorrect,
            0x24 => NegativeResponseCode::RequestSequenceError,
            0x31 => NegativeResponseCode::RequestOutOfRange,
            0x33 => NegativeResponseCode::SecurityAccessDenied,
            0x35 => NegativeResponseCode::InvalidKey,
            0x36 => NegativeResponseCode::ExceededNumberOfAttempts,
            0x37 => NegativeResponseCode::RequiredTimeDelayNotExpired,
            0x78 => NegativeResponseCode::RequestCorrectlyReceivedResponsePending,
            0x7E => NegativeResponseCode::SubFunctionNotSupportedInActiveSession,
            0x7F => NegativeResponseCode::ServiceNotSupportedInActiveSession,
            0x80..=0xFF => NegativeResponseCode::VendorSpecific(raw),
            other => NegativeResponseCode::Other(other),
        }
    }
}

impl From<NegativeResponseCode> for u8 {
    fn from(code: NegativeResponseCode) -> Self {
        match code {
            NegativeResponseCode::GeneralReject => 0x10,
            NegativeResponseCode::ServiceNotSupported => 0x11,
            NegativeResponseCode::SubFunctionNotSupported => 0x12,
            NegativeResponseCode::IncorrectMessageLengthOrInvalidFormat => 0x13,
            NegativeResponseCode::ResponseTooLong => 0x14,
            NegativeResponseCode::BusyRepeatRequest => 0x21,
            NegativeResponseCode::ConditionsNotCorrect => 0x22,
            NegativeResponseCode::RequestSequenceError => 0x24,
            NegativeResponseCode::RequestOutOfRange => 0x31,
            NegativeResponseCode::SecurityAccessDenied => 0x33,
            NegativeResponseCode::InvalidKey => 0x35,
            NegativeResponseCode::ExceededNumberOfAttempts => 0x36,
            NegativeResponseCode::RequiredTimeDelayNotExpired => 0x37,
            NegativeResponseCode::RequestCorrectlyReceivedResponsePending => 0x78,
            NegativeResponseCode::SubFunctionNotSupportedInActiveSession => 0x7E,
            NegativeResponseCode::ServiceNotSupportedInActiveSession => 0x7F,
            NegativeResponseCode::VendorSpecific(v) => v,
            NegativeResponseCode::Other(v) => v,
        }
    }
}

impl std::fmt::Display for NegativeResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, u8::from(*self))
    }
}

/// Classifies one completed ISO-TP payload as a positive or negative UDS
/// response to `requested_service`.
///
/// An empty payload is treated as a synthetic `GeneralReject`: the wire never
/// actually carries this, but it gives callers a uniform outcome instead of
/// an out-of-bounds panic.
pub fn parse_response(requested_service: u8, raw: &[u8]) -> UdsResponse {
    if raw.is_empty() {
        return UdsResponse::Negative {
            service_id: requested_service,
            code: NegativeResponseCode::GeneralReject,
            raw: raw.to_vec(),
        };
    }

    if raw[0] == 0x7F && raw.len() >= 3 {
        return UdsResponse::Negative {
            service_id: raw[1],
            code: NegativeResponseCode::from(raw[2]),
            raw: raw.to_vec(),
        };
    }

    if raw[0] == requested_service + 0x40 {
        return UdsResponse::Positive {
            service_id: requested_service,
            body: raw[1..].to_vec(),
            raw: raw.to_vec(),
        };
    }

    UdsResponse::Negative {
        service_id: requested_service,
        code: NegativeResponseCode::GeneralReject,
        raw: raw.to_vec(),
    }
}

/// Parses the positive body of a `ReadDtcInformation(0x02, _)` response
/// (`reportDTCByStatusMask`) into DTC records.
///
/// `body` is `[sub_function, status_availability_mask, (hi, mid, lo,
/// status)...]`. Trailing bytes that don't form a complete 4-byte record are
/// ignored. A body shorter than 2 bytes yields an empty list.
pub fn parse_dtc_records(body: &[u8]) -> Vec<crate::dtc::DiagnosticTroubleCode> {
    if body.len() < 2 {
        return Vec::new();
    }
    body[2..]
        .chunks_exact(4)
        .map(|c| crate::dtc::DiagnosticTroubleCode::from_bytes(c[0], c[1], c[2], c[3]))
        .collect()
}

#[cfg(test)]
mod test_parse {
    use super::*;

    #[test]
    fn positive_and_negative_are_disjoint() {
        let pos = parse_response(0x22, &[0x62, 0xF1, 0x90]);
        assert!(matches!(pos, UdsResponse::Positive { .. }));

        let neg = parse_response(0x22, &[0x7F, 0x22, 0x31]);
        assert!(matches!(neg, UdsResponse::Negative { .. }));
    }

    #[test]
    fn negative_decodes_code_byte() {
        let resp = parse_response(0x22, &[0x7F, 0x22, 0x31]);
        match resp {
            UdsResponse::Negative { code, .. } => {
                assert_eq!(code, NegativeResponseCode::RequestOutOfRange)
            }
            _ => panic!("expected negative"),
        }
    }

    #[test]
    fn vendor_specific_catchall() {
        assert_eq!(NegativeResponseCode::from(0x99), NegativeResponseCode::VendorSpecific(0x99));
    }

    #[test]
    fn empty_payload_is_general_reject() {
        let resp = parse_response(0x22, &[]);
        assert!(matches!(
            resp,
            UdsResponse::Negative {
                code: NegativeResponseCode::GeneralReject,
                ..
            }
        ));
    }

    #[test]
    fn dtc_record_parsing_matches_scenario_s4() {
        let body = [0x02, 0xFF, 0x03, 0x00, 0x00, 0x08, 0x01, 0x71, 0x00, 0x08];
        let dtcs = parse_dtc_records(&body);
        assert_eq!(dtcs.len(), 2);
        assert_eq!(dtcs[0].display(), "P0300");
        assert_eq!(dtcs[1].display(), "P0171");
    }

    #[test]
    fn short_body_yields_empty_list() {
        assert!(parse_dtc_records(&[0x02]).is_empty());
    }
}
