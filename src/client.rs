//! `UdsClient`: the session core that sequences one request/response
//! transaction end-to-end, including the `0x78` response-pending retry loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::error::{DiagError, DiagServerResult, TimeoutPhase};
use crate::isotp::{DecoderConfig, DecoderEvent, EncoderConfig, IsoTpDecoder, IsoTpEncoder};
use crate::transport::{FrameTransport, ModuleAddress};
use crate::uds::request::{
    clear_diagnostic_information, diagnostic_session_control, diagnostic_session_control::DiagnosticSessionType,
    ecu_reset, ecu_reset::EcuResetType, read_data_by_identifier, read_dtc_information,
    read_dtc_information::DtcSubFunction, tester_present,
};
use crate::uds::{parse_dtc_records, parse_response, NegativeResponseCode, UdsResponse};

/// Timing budgets for one [UdsClient], grounded on the teacher's
/// `UdsServerOptions` config-struct convention.
#[derive(Debug, Copy, Clone)]
pub struct TimingConfig {
    /// Initial response window
    pub p2: Duration,
    /// Extended response window after a `0x78` response-pending
    pub p2_star: Duration,
    /// Flow-control receive window
    pub flow_control_timeout: Duration,
    /// Consecutive-frame receive window
    pub consecutive_frame_timeout: Duration,
    /// Maximum consecutive flow-control `Wait` frames tolerated
    pub max_consecutive_wait: u8,
    /// Maximum consecutive `0x78` responses tolerated before `PendingAbuse`
    pub max_consecutive_pending: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            p2: Duration::from_millis(1000),
            p2_star: Duration::from_millis(5000),
            flow_control_timeout: Duration::from_millis(1000),
            consecutive_frame_timeout: Duration::from_millis(1000),
            max_consecutive_wait: 10,
            max_consecutive_pending: 10,
        }
    }
}

/// A cooperative cancellation signal, checked at every suspension point
///
/// Grounded on the teacher's `Arc<AtomicBool>` `server_running` flag in
/// `uds/mod.rs`, repurposed here as a caller-held, per-call flag rather than
/// a server-lifetime one (this crate spawns no background server).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Builds a fresh, not-yet-cancelled token
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signals cancellation; observed by the client at its next suspension point
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True if [Self::cancel] has been called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Positive `ReadDataByIdentifier` result: the echoed DID and its value bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataByIdentifier {
    /// DID echoed by the ECU
    pub did: u16,
    /// Value bytes following the echoed DID
    pub value: Vec<u8>,
}

/// One UDS session bound to a transport, a module, and a timing configuration
///
/// Stateless between transactions: each call to a service method runs the
/// full transaction algorithm and returns. See `spec.md` §5 for the
/// concurrency model this assumes (single caller per client).
#[derive(Debug)]
pub struct UdsClient<T: FrameTransport> {
    transport: T,
    module: ModuleAddress,
    timing: TimingConfig,
    encoder: IsoTpEncoder,
}

impl<T: FrameTransport> UdsClient<T> {
    /// Builds a client bound to `transport` and `module`, using the given
    /// timing and ISO-TP encoder configuration
    pub fn new(transport: T, module: ModuleAddress, timing: TimingConfig, encoder: EncoderConfig) -> Self {
        Self {
            transport,
            module,
            timing,
            encoder: IsoTpEncoder::new(encoder),
        }
    }

    /// Current timing configuration (possibly updated by [Self::start_session])
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Mutable access to the underlying transport, for callers that need to
    /// reconfigure its acceptance filter directly
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Runs one complete UDS transaction: builds nothing itself, but sends
    /// `service_id, body` and returns the classified response, consuming any
    /// number of `0x78` response-pending replies internally.
    pub fn transact(
        &mut self,
        service_id: u8,
        body: Vec<u8>,
        cancel: &CancellationToken,
    ) -> DiagServerResult<UdsResponse> {
        let request_bytes = {
            let mut b = Vec::with_capacity(1 + body.len());
            b.push(service_id);
            b.extend_from_slice(&body);
            b
        };

        if cancel.is_cancelled() {
            return Err(DiagError::Cancelled);
        }

        self.encoder
            .encode_and_send(&mut self.transport, &self.module, &request_bytes)?;

        let mut deadline = Instant::now() + self.timing.p2;
        let mut phase = TimeoutPhase::P2;
        let mut pending_count = 0u8;

        loop {
            let payload = self.receive_payload(deadline, phase, cancel)?;
            let response = parse_response(service_id, &payload);

            match &response {
                UdsResponse::Negative {
                    code: NegativeResponseCode::RequestCorrectlyReceivedResponsePending,
                    ..
                } => {
                    pending_count += 1;
                    trace!(
                        "uds service 0x{:02X}: response pending ({}/{})",
                        service_id, pending_count, self.timing.max_consecutive_pending
                    );
                    if pending_count > self.timing.max_consecutive_pending {
                        return Err(DiagError::PendingAbuse);
                    }
                    deadline = Instant::now() + self.timing.p2_star;
                    phase = TimeoutPhase::P2Star;
                    continue;
                }
                UdsResponse::Positive { .. } => {
                    debug!("uds service 0x{:02X}: positive response", service_id);
                    return Ok(response);
                }
                UdsResponse::Negative { code, .. } => {
                    debug!("uds service 0x{:02X}: negative response {:?}", service_id, code);
                    return Ok(response);
                }
            }
        }
    }

    fn receive_payload(
        &mut self,
        deadline: Instant,
        phase: TimeoutPhase,
        cancel: &CancellationToken,
    ) -> DiagServerResult<Vec<u8>> {
        let mut decoder = IsoTpDecoder::new(DecoderConfig {
            consecutive_frame_timeout: self.timing.consecutive_frame_timeout,
        });

        loop {
            if cancel.is_cancelled() {
                return Err(DiagError::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DiagError::Timeout { phase });
            }

            let recv_deadline = match decoder.pending_deadline() {
                Some(reassembly_deadline) => reassembly_deadline.min(deadline),
                None => deadline,
            };

            match self.transport.recv(recv_deadline)? {
                None => {
                    if let Some(err) = decoder.poll_timeout(Instant::now()) {
                        warn!("uds transaction: {}", err);
                        return Err(DiagError::IsoTp(err));
                    }
                    if Instant::now() >= deadline {
                        return Err(DiagError::Timeout { phase });
                    }
                    continue;
                }
                Some(frame) => {
                    if frame.arbitration_id() != self.module.response_id {
                        continue;
                    }
                    match decoder.feed(&mut self.transport, &self.module, frame.data(), Instant::now()) {
                        Ok(DecoderEvent::Complete(payload)) => return Ok(payload),
                        Ok(DecoderEvent::Pending) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }

    /// `DiagnosticSessionControl`: a positive response's body is
    /// `[session_echo, p2_server_hi, p2_server_lo, p2_star_server_hi,
    /// p2_star_server_lo]`; on success this updates [Self::timing] from the
    /// server-reported values.
    pub fn start_session(
        &mut self,
        session: DiagnosticSessionType,
        cancel: &CancellationToken,
    ) -> DiagServerResult<UdsResponse> {
        let req = diagnostic_session_control::build(session);
        let response = self.transact(req.service_id, req.body, cancel)?;
        if let UdsResponse::Positive { body, .. } = &response {
            if body.len() >= 5 {
                let p2_server = u16::from_be_bytes([body[1], body[2]]);
                let p2_star_server = u16::from_be_bytes([body[3], body[4]]);
                self.timing.p2 = Duration::from_millis(p2_server as u64);
                self.timing.p2_star = Duration::from_millis(p2_star_server as u64);
            }
        }
        Ok(response)
    }

    /// `ReadDataByIdentifier` for a single DID; on a positive response
    /// splits the echoed DID from the value bytes.
    pub fn read_data_by_identifier(
        &mut self,
        did: u16,
        cancel: &CancellationToken,
    ) -> DiagServerResult<DataByIdentifier> {
        let req = read_data_by_identifier::build(&[did]);
        let response = self.transact(req.service_id, req.body, cancel)?;
        match response {
            UdsResponse::Positive { body, .. } if body.len() >= 2 => Ok(DataByIdentifier {
                did: u16::from_be_bytes([body[0], body[1]]),
                value: body[2..].to_vec(),
            }),
            UdsResponse::Positive { .. } => Err(DiagError::MalformedResponse),
            UdsResponse::Negative { service_id, code, .. } => Err(DiagError::UdsNegative { service: service_id, code }),
        }
    }

    /// Issues `ReadDtcInformation(0x02, 0xFF)` and returns the decoded list
    pub fn read_dtcs(
        &mut self,
        cancel: &CancellationToken,
    ) -> DiagServerResult<Vec<crate::dtc::DiagnosticTroubleCode>> {
        let req = read_dtc_information::build(DtcSubFunction::ReportDtcByStatusMask, 0xFF);
        let response = self.transact(req.service_id, req.body, cancel)?;
        match response {
            UdsResponse::Positive { body, .. } => Ok(parse_dtc_records(&body)),
            UdsResponse::Negative { service_id, code, .. } => Err(DiagError::UdsNegative { service: service_id, code }),
        }
    }

    /// Issues `ClearDiagnosticInformation(0xFFFFFF)`; returns the raw response
    pub fn clear_dtcs(&mut self, cancel: &CancellationToken) -> DiagServerResult<UdsResponse> {
        let req = clear_diagnostic_information::build(clear_diagnostic_information::GROUP_ALL);
        self.transact(req.service_id, req.body, cancel)
    }

    /// Issues `EcuReset(kind)`; returns the raw response. No automatic
    /// retransmit - the caller is responsible for waiting out the reset.
    pub fn ecu_reset(&mut self, kind: EcuResetType, cancel: &CancellationToken) -> DiagServerResult<UdsResponse> {
        let req = ecu_reset::build(kind);
        self.transact(req.service_id, req.body, cancel)
    }

    /// Issues `TesterPresent`. `suppress_positive_response` is `false` by
    /// default elsewhere in this crate so callers can observe success; this
    /// method takes it explicitly since some callers do want it suppressed.
    pub fn tester_present(
        &mut self,
        suppress_positive_response: bool,
        cancel: &CancellationToken,
    ) -> DiagServerResult<UdsResponse> {
        let req = tester_present::build(suppress_positive_response);
        self.transact(req.service_id, req.body, cancel)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::transport::CanFrame;

    fn client(transport: FakeTransport) -> UdsClient<FakeTransport> {
        UdsClient::new(
            transport,
            ModuleAddress::standard(0x7E0, 0x7E8),
            TimingConfig::default(),
            EncoderConfig::default(),
        )
    }

    #[test]
    fn s1_read_vin_multi_frame() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x10, 0x14, 0x62, 0xF1, 0x90, 0x31, 0x43, 0x34]));
        transport.push_incoming(CanFrame::new(0x7E8, &[0x21, 0x52, 0x4A, 0x46, 0x41, 0x47, 0x35, 0x46]));
        transport.push_incoming(CanFrame::new(0x7E8, &[0x22, 0x43, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let result = client.read_data_by_identifier(0xF190, &cancel).unwrap();
        assert_eq!(result.did, 0xF190);
        assert_eq!(
            result.value,
            vec![0x31, 0x43, 0x34, 0x52, 0x4A, 0x46, 0x41, 0x47, 0x35, 0x46, 0x43, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36]
        );
    }

    #[test]
    fn s3_negative_request_out_of_range() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x7F, 0x22, 0x31, 0x00, 0x00, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let err = client.read_data_by_identifier(0xF190, &cancel).unwrap_err();
        assert!(matches!(
            err,
            DiagError::UdsNegative {
                code: NegativeResponseCode::RequestOutOfRange,
                ..
            }
        ));
    }

    #[test]
    fn s4_dtc_records() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x10, 0x0B, 0x59, 0x02, 0xFF, 0x03, 0x00, 0x00]));
        transport.push_incoming(CanFrame::new(0x7E8, &[0x21, 0x08, 0x01, 0x71, 0x00, 0x08, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let dtcs = client.read_dtcs(&cancel).unwrap();
        assert_eq!(dtcs.len(), 2);
        assert_eq!(dtcs[0].display(), "P0300");
        assert_eq!(dtcs[1].display(), "P0171");
    }

    #[test]
    fn s5_pending_retries_are_invisible_to_caller() {
        let mut transport = FakeTransport::new();
        for _ in 0..3 {
            transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x7F, 0x22, 0x78, 0x00, 0x00, 0x00, 0x00]));
        }
        transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x62, 0xF1, 0x90, 0x00, 0x00, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let result = client.read_data_by_identifier(0xF190, &cancel).unwrap();
        assert_eq!(result.did, 0xF190);
        assert!(result.value.is_empty());
    }

    #[test]
    fn pending_cap_exceeded_yields_pending_abuse() {
        let mut transport = FakeTransport::new();
        for _ in 0..11 {
            transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x7F, 0x22, 0x78, 0x00, 0x00, 0x00, 0x00]));
        }
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let err = client.read_data_by_identifier(0xF190, &cancel).unwrap_err();
        assert!(matches!(err, DiagError::PendingAbuse));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let transport = FakeTransport::new();
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client.read_data_by_identifier(0xF190, &cancel).unwrap_err();
        assert!(matches!(err, DiagError::Cancelled));
    }

    #[test]
    fn no_response_yields_timeout() {
        let transport = FakeTransport::new();
        let mut client = client(transport);
        client.timing.p2 = Duration::from_millis(5);
        let cancel = CancellationToken::new();
        let err = client.read_data_by_identifier(0xF190, &cancel).unwrap_err();
        assert!(matches!(
            err,
            DiagError::Timeout {
                phase: TimeoutPhase::P2
            }
        ));
    }
}
