//! ISO 15765-2 (ISO-TP) segmentation and reassembly
//!
//! This is the frame-level transport that carries arbitrary-length UDS
//! payloads (1..=4095 bytes) over fixed 8-byte CAN frames, using a
//! single-frame encoding for short payloads and a first-frame / flow-control
//! / consecutive-frame handshake for longer ones.

mod decoder;
mod encoder;
mod error;

pub use decoder::{DecoderConfig, DecoderEvent, IsoTpDecoder};
pub use encoder::{EncoderConfig, IsoTpEncoder};
pub use error::IsoTpError;

use std::time::Instant;

/// Largest payload length the 12-bit first-frame length field can declare
pub const MAX_ISOTP_PAYLOAD: usize = 4095;

/// Flow-control status byte (low nibble of PCI byte `0x3S`)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    /// Receiver is ready for more consecutive frames
    Continue,
    /// Receiver needs more time before it can accept consecutive frames
    Wait,
    /// Receiver cannot accept this message at all
    Overflow,
}

/// One ISO-TP protocol data unit, discriminated on the PCI nibble
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsoTpFrame {
    /// `0x0N` - a complete payload of 1..=7 bytes in a single CAN frame
    Single {
        /// Declared payload length (1..=7)
        length: u8,
        /// Payload bytes
        data: Vec<u8>,
    },
    /// `0x1L LL` - first frame of a multi-frame message
    First {
        /// Total payload length across all frames (8..=4095)
        total_length: u16,
        /// First 6 payload bytes carried in this frame
        data: Vec<u8>,
    },
    /// `0x2N` - one segment of a multi-frame message
    Consecutive {
        /// Sequence number, 0..=15, wrapping
        sequence: u8,
        /// Up to 7 payload bytes carried in this frame
        data: Vec<u8>,
    },
    /// `0x3S` - flow-control response to a first-frame
    FlowControl {
        /// Continue / Wait / Overflow
        status: FlowStatus,
        /// Frames the sender may transmit before waiting for another FC
        /// (0 = unlimited)
        block_size: u8,
        /// Minimum spacing between consecutive frames
        st_min: u8,
    },
}

impl IsoTpFrame {
    /// Parses the PCI byte(s) of a raw CAN payload into an [IsoTpFrame]
    ///
    /// Returns `None` if the frame is structurally invalid (empty payload,
    /// or an first-frame/consecutive-frame too short to hold its own PCI
    /// bytes). Semantic validation (e.g. first-frame length `<= 7`) is left
    /// to the decoder, which needs to report those as protocol errors rather
    /// than silently drop the frame.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let pci = *raw.first()?;
        match pci & 0xF0 {
            0x00 => {
                let length = pci & 0x0F;
                if length == 0 || (length as usize) > raw.len() - 1 {
                    return None;
                }
                Some(IsoTpFrame::Single {
                    length,
                    data: raw[1..1 + length as usize].to_vec(),
                })
            }
            0x10 => {
                if raw.len() < 2 {
                    return None;
                }
                let total_length = ((pci as u16 & 0x0F) << 8) | raw[1] as u16;
                Some(IsoTpFrame::First {
                    total_length,
                    data: raw[2..].to_vec(),
                })
            }
            0x20 => Some(IsoTpFrame::Consecutive {
                sequence: pci & 0x0F,
                data: raw[1..].to_vec(),
            }),
            0x30 => {
                if raw.len() < 3 {
                    return None;
                }
                let status = match pci & 0x0F {
                    0 => FlowStatus::Continue,
                    1 => FlowStatus::Wait,
                    2 => FlowStatus::Overflow,
                    _ => return None,
                };
                Some(IsoTpFrame::FlowControl {
                    status,
                    block_size: raw[1],
                    st_min: raw[2],
                })
            }
            _ => None,
        }
    }
}

/// Reassembler state for one in-progress multi-frame receive
///
/// Destroyed (never half-returned) on completion, sequence mismatch, or
/// deadline expiry - an ISO-TP receive either completes fully or fails.
#[derive(Debug, Clone)]
pub(crate) struct PendingPayload {
    pub total_length: usize,
    pub collected: Vec<u8>,
    pub next_sequence: u8,
    pub deadline: Instant,
}

impl PendingPayload {
    /// True once `collected` has reached `total_length`
    pub fn is_complete(&self) -> bool {
        self.collected.len() >= self.total_length
    }
}
