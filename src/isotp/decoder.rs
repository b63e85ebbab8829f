//! Reassembles an incoming stream of CAN frames back into complete UDS
//! payloads, emitting the flow-control handshake as needed.

use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::transport::{CanFrame, FrameTransport, ModuleAddress};

use super::{FlowStatus, IsoTpError, IsoTpFrame, PendingPayload, MAX_ISOTP_PAYLOAD};

/// Decoder-side configuration
#[derive(Debug, Copy, Clone)]
pub struct DecoderConfig {
    /// How long to wait for the next consecutive-frame before declaring a
    /// reassembly timeout
    pub consecutive_frame_timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            consecutive_frame_timeout: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Assembling(PendingPayload),
}

/// Outcome of feeding one frame to the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// The frame was consumed but no complete payload is available yet
    Pending,
    /// A complete UDS payload is ready
    Complete(Vec<u8>),
}

/// ISO-TP reassembler
///
/// One [IsoTpDecoder] owns exactly one in-progress [PendingPayload] at a
/// time; the reassembler never yields a partial payload (it either completes
/// fully or the attempt is discarded and reported as an error).
#[derive(Debug)]
pub struct IsoTpDecoder {
    config: DecoderConfig,
    state: State,
}

impl IsoTpDecoder {
    /// Builds a decoder in the Idle state
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    /// True if a multi-frame receive is currently in progress
    pub fn is_assembling(&self) -> bool {
        matches!(self.state, State::Assembling(_))
    }

    /// Deadline of the in-progress reassembly, if any
    pub fn pending_deadline(&self) -> Option<Instant> {
        match &self.state {
            State::Assembling(pending) => Some(pending.deadline),
            State::Idle => None,
        }
    }

    /// Checks whether the in-progress reassembly (if any) has missed its
    /// deadline, resetting to Idle and returning the timeout error if so.
    ///
    /// Callers drive this on every wait-loop iteration alongside [Self::feed].
    pub fn poll_timeout(&mut self, now: Instant) -> Option<IsoTpError> {
        if let State::Assembling(pending) = &self.state {
            if now >= pending.deadline {
                self.state = State::Idle;
                return Some(IsoTpError::ReassemblyTimeout);
            }
        }
        None
    }

    /// Feeds one raw CAN payload (already filtered to the expected response
    /// arbitration id) into the decoder.
    pub fn feed<T: FrameTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        module: &ModuleAddress,
        raw: &[u8],
        now: Instant,
    ) -> Result<DecoderEvent, IsoTpDecodeError> {
        let frame = match IsoTpFrame::parse(raw) {
            Some(f) => f,
            None => return Ok(DecoderEvent::Pending),
        };

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => self.handle_idle(transport, module, frame, now),
            State::Assembling(pending) => self.handle_assembling(transport, module, frame, pending, now),
        }
    }

    fn handle_idle<T: FrameTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        module: &ModuleAddress,
        frame: IsoTpFrame,
        now: Instant,
    ) -> Result<DecoderEvent, IsoTpDecodeError> {
        match frame {
            IsoTpFrame::Single { data, .. } => {
                trace!("isotp rx single frame: {:02X?}", data);
                Ok(DecoderEvent::Complete(data))
            }
            IsoTpFrame::First { total_length, data } => {
                if total_length <= 7 {
                    return Err(IsoTpDecodeError::IsoTp(IsoTpError::InvalidFirstFrameLength));
                }
                let total_length = (total_length as usize).min(MAX_ISOTP_PAYLOAD);
                trace!("isotp rx first frame, total_length={}", total_length);

                self.send_flow_control(transport, module)?;

                let mut collected = data;
                collected.truncate(total_length);
                self.state = State::Assembling(PendingPayload {
                    total_length,
                    collected,
                    next_sequence: 1,
                    deadline: now + self.config.consecutive_frame_timeout,
                });
                Ok(DecoderEvent::Pending)
            }
            IsoTpFrame::Consecutive { .. } => {
                Err(IsoTpDecodeError::IsoTp(IsoTpError::UnexpectedConsecutive))
            }
            IsoTpFrame::FlowControl { .. } => {
                // Not this layer's concern while idle; the encoder consumes
                // flow-control frames directly while transmitting.
                Ok(DecoderEvent::Pending)
            }
        }
    }

    fn handle_assembling<T: FrameTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        module: &ModuleAddress,
        frame: IsoTpFrame,
        mut pending: PendingPayload,
        now: Instant,
    ) -> Result<DecoderEvent, IsoTpDecodeError> {
        match frame {
            IsoTpFrame::Consecutive { sequence, data } => {
                if sequence != pending.next_sequence {
                    warn!(
                        "isotp sequence error: expected {}, got {}",
                        pending.next_sequence, sequence
                    );
                    return Err(IsoTpDecodeError::IsoTp(IsoTpError::SequenceError {
                        expected: pending.next_sequence,
                        got: sequence,
                    }));
                }
                let remaining = pending.total_length - pending.collected.len();
                let take = data.len().min(remaining);
                pending.collected.extend_from_slice(&data[..take]);

                if pending.is_complete() {
                    trace!("isotp reassembly complete, {} bytes", pending.collected.len());
                    self.state = State::Idle;
                    Ok(DecoderEvent::Complete(pending.collected))
                } else {
                    pending.next_sequence = (pending.next_sequence + 1) % 16;
                    pending.deadline = now + self.config.consecutive_frame_timeout;
                    self.state = State::Assembling(pending);
                    Ok(DecoderEvent::Pending)
                }
            }
            IsoTpFrame::Single { .. } | IsoTpFrame::First { .. } => {
                warn!("isotp interleaved message; dropping in-progress reassembly");
                self.state = State::Idle;
                // Process the new frame fresh so the state machine is left
                // correctly positioned for what follows, but the dropped
                // transaction itself is what this call reports - a transport
                // failure while doing so (e.g. sending flow control for the
                // new first-frame) takes priority over that report.
                match self.handle_idle(transport, module, frame, now) {
                    Ok(_) | Err(IsoTpDecodeError::IsoTp(_)) => {
                        Err(IsoTpDecodeError::IsoTp(IsoTpError::InterleavedMessage))
                    }
                    Err(transport_err @ IsoTpDecodeError::Transport(_)) => Err(transport_err),
                }
            }
            IsoTpFrame::FlowControl { .. } => {
                self.state = State::Assembling(pending);
                Ok(DecoderEvent::Pending)
            }
        }
    }

    fn send_flow_control<T: FrameTransport + ?Sized>(
        &self,
        transport: &mut T,
        module: &ModuleAddress,
    ) -> Result<(), IsoTpDecodeError> {
        let fc = [0x30 | flow_status_nibble(FlowStatus::Continue), 0x00, 0x00];
        transport
            .send(&CanFrame::new(module.request_id, &fc))
            .map_err(IsoTpDecodeError::Transport)
    }
}

fn flow_status_nibble(status: FlowStatus) -> u8 {
    match status {
        FlowStatus::Continue => 0,
        FlowStatus::Wait => 1,
        FlowStatus::Overflow => 2,
    }
}

/// Failure modes that can occur while reassembling a payload
#[derive(Debug)]
pub enum IsoTpDecodeError {
    /// Underlying transport failure (sending the flow-control frame)
    Transport(crate::error::TransportError),
    /// ISO-TP protocol-level failure
    IsoTp(IsoTpError),
}

impl std::fmt::Display for IsoTpDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsoTpDecodeError::Transport(e) => write!(f, "{}", e),
            IsoTpDecodeError::IsoTp(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IsoTpDecodeError {}

impl From<IsoTpDecodeError> for crate::error::DiagError {
    fn from(e: IsoTpDecodeError) -> Self {
        match e {
            IsoTpDecodeError::Transport(t) => crate::error::DiagError::Transport(t),
            IsoTpDecodeError::IsoTp(i) => crate::error::DiagError::IsoTp(i),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::transport::ModuleAddress;

    fn module() -> ModuleAddress {
        ModuleAddress::standard(0x7E0, 0x7E8)
    }

    #[test]
    fn single_frame_emits_immediately() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let event = decoder
            .feed(&mut transport, &module(), &[0x03, 0x62, 0xF1, 0x90], Instant::now())
            .unwrap();
        assert_eq!(event, DecoderEvent::Complete(vec![0x62, 0xF1, 0x90]));
    }

    #[test]
    fn multi_frame_vin_reassembles_and_sends_fc() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let now = Instant::now();

        let ev = decoder
            .feed(
                &mut transport,
                &module(),
                &[0x10, 0x14, 0x62, 0xF1, 0x90, 0x31, 0x43, 0x34],
                now,
            )
            .unwrap();
        assert_eq!(ev, DecoderEvent::Pending);
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].data(), &[0x30, 0x00, 0x00]);

        let ev = decoder
            .feed(
                &mut transport,
                &module(),
                &[0x21, 0x52, 0x4A, 0x46, 0x41, 0x47, 0x35, 0x46],
                now,
            )
            .unwrap();
        assert_eq!(ev, DecoderEvent::Pending);

        let ev = decoder
            .feed(
                &mut transport,
                &module(),
                &[0x22, 0x43, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36],
                now,
            )
            .unwrap();
        assert_eq!(
            ev,
            DecoderEvent::Complete(vec![
                0x62, 0xF1, 0x90, 0x31, 0x43, 0x34, 0x52, 0x4A, 0x46, 0x41, 0x47, 0x35, 0x46, 0x43,
                0x31, 0x32, 0x33, 0x34, 0x35, 0x36,
            ])
        );
    }

    #[test]
    fn sequence_error_drops_pending() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let now = Instant::now();
        decoder
            .feed(&mut transport, &module(), &[0x10, 0x0A, 1, 2, 3, 4, 5, 6], now)
            .unwrap();
        let err = decoder
            .feed(&mut transport, &module(), &[0x22, 7, 8, 9, 10, 0, 0, 0], now)
            .unwrap_err();
        assert!(matches!(
            err,
            IsoTpDecodeError::IsoTp(IsoTpError::SequenceError { expected: 1, got: 2 })
        ));
        assert!(!decoder.is_assembling());
    }

    #[test]
    fn unexpected_consecutive_while_idle() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let err = decoder
            .feed(&mut transport, &module(), &[0x21, 1, 2, 3, 4, 5, 6, 7], Instant::now())
            .unwrap_err();
        assert!(matches!(
            err,
            IsoTpDecodeError::IsoTp(IsoTpError::UnexpectedConsecutive)
        ));
    }

    #[test]
    fn invalid_first_frame_length() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let err = decoder
            .feed(&mut transport, &module(), &[0x10, 0x05, 1, 2, 3, 4, 5, 6], Instant::now())
            .unwrap_err();
        assert!(matches!(
            err,
            IsoTpDecodeError::IsoTp(IsoTpError::InvalidFirstFrameLength)
        ));
    }

    #[test]
    fn reassembly_timeout() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig {
            consecutive_frame_timeout: Duration::from_millis(10),
        });
        let mut transport = FakeTransport::new();
        let now = Instant::now();
        decoder
            .feed(&mut transport, &module(), &[0x10, 0x0A, 1, 2, 3, 4, 5, 6], now)
            .unwrap();
        let later = now + Duration::from_millis(11);
        assert_eq!(decoder.poll_timeout(later), Some(IsoTpError::ReassemblyTimeout));
        assert!(!decoder.is_assembling());
    }

    #[test]
    fn interleaved_message_restarts_cleanly() {
        let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
        let mut transport = FakeTransport::new();
        let now = Instant::now();
        decoder
            .feed(&mut transport, &module(), &[0x10, 0x0A, 1, 2, 3, 4, 5, 6], now)
            .unwrap();
        let err = decoder
            .feed(&mut transport, &module(), &[0x03, 0x62, 0xF1, 0x90], now)
            .unwrap_err();
        assert!(matches!(
            err,
            IsoTpDecodeError::IsoTp(IsoTpError::InterleavedMessage)
        ));
        assert!(!decoder.is_assembling());

        // the interleaving single-frame was still processed fresh; the
        // decoder is left clean and ready for the next request
        let ev = decoder
            .feed(&mut transport, &module(), &[0x03, 0x11, 0x22, 0x33], now)
            .unwrap();
        assert_eq!(ev, DecoderEvent::Complete(vec![0x11, 0x22, 0x33]));
    }
}
