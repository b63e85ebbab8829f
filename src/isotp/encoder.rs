//! Turns a UDS payload into a sequence of CAN frames, driving the
//! first-frame / flow-control handshake for multi-frame messages.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::transport::{CanFrame, FrameTransport, ModuleAddress};

use super::{FlowStatus, IsoTpError, IsoTpFrame, MAX_ISOTP_PAYLOAD};

/// Encoder-side configuration
#[derive(Debug, Copy, Clone)]
pub struct EncoderConfig {
    /// Byte used to pad frames shorter than 8 bytes
    pub padding_byte: u8,
    /// Whether to pad frames at all (some ECUs reject padding)
    pub use_padding: bool,
    /// Maximum number of consecutive flow-control `Wait` frames tolerated
    /// before aborting
    pub max_wait_frames: u8,
    /// How long to wait for a flow-control frame after sending a first-frame
    pub flow_control_timeout: Duration,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            padding_byte: 0x00,
            use_padding: true,
            max_wait_frames: 10,
            flow_control_timeout: Duration::from_millis(1000),
        }
    }
}

/// Converts payloads into ISO-TP frame sequences and drives them onto a
/// [FrameTransport]
#[derive(Debug, Clone, Copy)]
pub struct IsoTpEncoder {
    config: EncoderConfig,
}

impl IsoTpEncoder {
    /// Builds an encoder with the given configuration
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    fn pad(&self, bytes: &mut Vec<u8>) {
        if self.config.use_padding {
            while bytes.len() < 8 {
                bytes.push(self.config.padding_byte);
            }
        }
    }

    /// Splits `payload` into CAN frames and returns them without sending
    /// anything. Used by tests that check frame shape without a transport.
    pub fn segment(&self, payload: &[u8]) -> Vec<Vec<u8>> {
        assert!(!payload.is_empty() && payload.len() <= MAX_ISOTP_PAYLOAD);
        let mut frames = Vec::new();

        if payload.len() <= 7 {
            let mut bytes = vec![0x00 | payload.len() as u8];
            bytes.extend_from_slice(payload);
            self.pad(&mut bytes);
            frames.push(bytes);
            return frames;
        }

        let mut bytes = vec![
            0x10 | ((payload.len() >> 8) as u8 & 0x0F),
            (payload.len() & 0xFF) as u8,
        ];
        bytes.extend_from_slice(&payload[0..6]);
        frames.push(bytes);

        let mut sequence: u8 = 1;
        let mut offset = 6;
        while offset < payload.len() {
            let chunk_end = (offset + 7).min(payload.len());
            let mut bytes = vec![0x20 | (sequence & 0x0F)];
            bytes.extend_from_slice(&payload[offset..chunk_end]);
            self.pad(&mut bytes);
            frames.push(bytes);
            offset = chunk_end;
            sequence = (sequence + 1) % 16;
        }
        frames
    }

    /// Encodes `payload` (1..=4095 bytes) and transmits it to
    /// `module.request_id`, performing the flow-control handshake if the
    /// message requires more than one frame.
    pub fn encode_and_send<T: FrameTransport + ?Sized>(
        &self,
        transport: &mut T,
        module: &ModuleAddress,
        payload: &[u8],
    ) -> Result<(), IsoTpEncodeError> {
        assert!(!payload.is_empty() && payload.len() <= MAX_ISOTP_PAYLOAD);

        let frames = self.segment(payload);
        if frames.len() == 1 {
            trace!("isotp tx single frame: {:02X?}", frames[0]);
            transport
                .send(&CanFrame::new(module.request_id, &frames[0]))
                .map_err(IsoTpEncodeError::Transport)?;
            return Ok(());
        }

        trace!("isotp tx first frame: {:02X?}", frames[0]);
        transport
            .send(&CanFrame::new(module.request_id, &frames[0]))
            .map_err(IsoTpEncodeError::Transport)?;

        let mut waits_seen = 0u8;
        let mut frame_idx = 1;
        while frame_idx < frames.len() {
            let (block_size, st_min) = loop {
                let deadline = Instant::now() + self.config.flow_control_timeout;
                let fc = self.await_flow_control(transport, module, deadline)?;
                match fc.status {
                    FlowStatus::Continue => {
                        waits_seen = 0;
                        break (fc.block_size, fc.st_min);
                    }
                    FlowStatus::Wait => {
                        waits_seen += 1;
                        debug!("isotp flow control WAIT ({}/{})", waits_seen, self.config.max_wait_frames);
                        if waits_seen > self.config.max_wait_frames {
                            return Err(IsoTpEncodeError::IsoTp(IsoTpError::FlowControlAbort));
                        }
                        continue;
                    }
                    FlowStatus::Overflow => {
                        warn!("isotp flow control overflow from receiver");
                        return Err(IsoTpEncodeError::IsoTp(IsoTpError::FlowControlOverflow));
                    }
                }
            };

            let st_min_delay = stmin_to_duration(st_min)
                .ok_or(IsoTpEncodeError::IsoTp(IsoTpError::InvalidStMin(st_min)))?;

            let mut sent_in_block = 0u8;
            while frame_idx < frames.len() {
                trace!("isotp tx consecutive frame: {:02X?}", frames[frame_idx]);
                transport
                    .send(&CanFrame::new(module.request_id, &frames[frame_idx]))
                    .map_err(IsoTpEncodeError::Transport)?;
                frame_idx += 1;
                sent_in_block += 1;
                if block_size != 0 && sent_in_block == block_size {
                    break;
                }
                if frame_idx < frames.len() && !st_min_delay.is_zero() {
                    std::thread::sleep(st_min_delay);
                }
            }
        }
        Ok(())
    }

    fn await_flow_control<T: FrameTransport + ?Sized>(
        &self,
        transport: &mut T,
        module: &ModuleAddress,
        deadline: Instant,
    ) -> Result<FlowControlFrame, IsoTpEncodeError> {
        loop {
            if Instant::now() >= deadline {
                return Err(IsoTpEncodeError::IsoTp(IsoTpError::FlowControlTimeout));
            }
            match transport.recv(deadline).map_err(IsoTpEncodeError::Transport)? {
                None => return Err(IsoTpEncodeError::IsoTp(IsoTpError::FlowControlTimeout)),
                Some(frame) => {
                    if frame.arbitration_id() != module.response_id {
                        continue;
                    }
                    match IsoTpFrame::parse(frame.data()) {
                        Some(IsoTpFrame::FlowControl {
                            status,
                            block_size,
                            st_min,
                        }) => {
                            return Ok(FlowControlFrame {
                                status,
                                block_size,
                                st_min,
                            })
                        }
                        _ => continue,
                    }
                }
            }
        }
    }
}

struct FlowControlFrame {
    status: FlowStatus,
    block_size: u8,
    st_min: u8,
}

/// Converts an ISO-TP `ST-min` byte into a sleep duration
///
/// `0x00..=0x7F` are milliseconds; `0xF1..=0xF9` are 100-900 microseconds;
/// any other value is a protocol error.
fn stmin_to_duration(st_min: u8) -> Option<Duration> {
    match st_min {
        0x00..=0x7F => Some(Duration::from_millis(st_min as u64)),
        0xF1..=0xF9 => Some(Duration::from_micros(100 * (st_min - 0xF0) as u64)),
        _ => None,
    }
}

/// Failure modes that can occur while encoding and transmitting a payload
#[derive(Debug)]
pub enum IsoTpEncodeError {
    /// Underlying transport failure
    Transport(crate::error::TransportError),
    /// ISO-TP protocol-level failure
    IsoTp(IsoTpError),
}

impl std::fmt::Display for IsoTpEncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsoTpEncodeError::Transport(e) => write!(f, "{}", e),
            IsoTpEncodeError::IsoTp(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IsoTpEncodeError {}

impl From<IsoTpEncodeError> for crate::error::DiagError {
    fn from(e: IsoTpEncodeError) -> Self {
        match e {
            IsoTpEncodeError::Transport(t) => crate::error::DiagError::Transport(t),
            IsoTpEncodeError::IsoTp(i) => crate::error::DiagError::IsoTp(i),
        }
    }
}
