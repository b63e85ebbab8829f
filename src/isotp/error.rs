//! ISO-TP specific error conditions

use std::fmt;

/// Errors produced by the ISO-TP segmentation/reassembly layer
///
/// None of these ever surface as a [crate::error::DiagError::UdsNegative] -
/// they mean the transport layer itself could not make sense of (or
/// complete) a frame sequence, which is a different failure mode to the ECU
/// replying with a well-formed negative response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IsoTpError {
    /// A consecutive-frame arrived with a sequence number that did not match
    /// the expected next sequence number
    SequenceError {
        /// Sequence number that was expected
        expected: u8,
        /// Sequence number that was actually received
        got: u8,
    },
    /// A consecutive-frame arrived while the decoder was Idle (no first-frame
    /// had been seen)
    UnexpectedConsecutive,
    /// A first-frame or single-frame arrived while a multi-frame receive was
    /// already in progress
    InterleavedMessage,
    /// No consecutive-frame arrived within the per-frame reassembly window
    ReassemblyTimeout,
    /// A first-frame declared a total length of 7 bytes or fewer (first-frames
    /// must declare at least 8)
    InvalidFirstFrameLength,
    /// A flow-control frame's `st_min` byte was outside the valid ranges
    /// (`0x00..=0x7F` or `0xF1..=0xF9`)
    InvalidStMin(u8),
    /// The receiver sent `Wait` more than the configured cap of consecutive
    /// times
    FlowControlAbort,
    /// The receiver sent `Overflow`: it cannot accept this message
    FlowControlOverflow,
    /// No flow-control frame arrived within the flow-control window
    FlowControlTimeout,
}

impl fmt::Display for IsoTpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsoTpError::SequenceError { expected, got } => {
                write!(f, "sequence error: expected {}, got {}", expected, got)
            }
            IsoTpError::UnexpectedConsecutive => {
                write!(f, "consecutive frame received while idle")
            }
            IsoTpError::InterleavedMessage => {
                write!(f, "new message started mid-reassembly")
            }
            IsoTpError::ReassemblyTimeout => write!(f, "timed out waiting for next consecutive frame"),
            IsoTpError::InvalidFirstFrameLength => {
                write!(f, "first-frame declared a length of 7 bytes or fewer")
            }
            IsoTpError::InvalidStMin(v) => write!(f, "invalid ST-min value 0x{:02X}", v),
            IsoTpError::FlowControlAbort => write!(f, "too many consecutive flow-control WAIT frames"),
            IsoTpError::FlowControlOverflow => write!(f, "receiver signalled overflow"),
            IsoTpError::FlowControlTimeout => write!(f, "timed out waiting for flow control"),
        }
    }
}

impl std::error::Error for IsoTpError {}
