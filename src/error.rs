//! Crate-wide error types
//!
//! Every fallible operation in this crate returns [DiagServerResult], whose
//! error side is the single [DiagError] sum type. The transport and ISO-TP
//! layers have their own narrower error enums ([TransportError],
//! [IsoTpError]) which [DiagError] wraps rather than flattens, so a caller
//! can always tell "the ECU said no" from "we never understood what the ECU
//! said" from "the bus itself is broken".

use std::fmt;

use crate::isotp::IsoTpError;
use crate::uds::NegativeResponseCode;

/// Diagnostic server result
pub type DiagServerResult<T> = Result<T, DiagError>;

/// Error produced by a [crate::transport::FrameTransport] implementation
#[derive(Debug)]
pub enum TransportError {
    /// CAN controller has entered the bus-off state
    BusOff,
    /// The transport's transmit buffer is full
    TxBufferFull,
    /// The underlying adapter or socket has disconnected
    Disconnected,
    /// Underlying IO error from a concrete transport (sockets, serial, etc.)
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::BusOff => write!(f, "CAN controller is bus-off"),
            TransportError::TxBufferFull => write!(f, "transmit buffer full"),
            TransportError::Disconnected => write!(f, "transport disconnected"),
            TransportError::Io(e) => write!(f, "transport IO error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies which wait a [DiagError::Timeout] occurred during
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Waiting for the initial response within `p2`
    P2,
    /// Waiting for a response after a `0x78` response-pending extension
    P2Star,
    /// Waiting for a flow-control frame after sending a first-frame
    FlowControl,
    /// Waiting for the next consecutive-frame while reassembling
    ConsecutiveFrame,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutPhase::P2 => write!(f, "P2"),
            TimeoutPhase::P2Star => write!(f, "P2*"),
            TimeoutPhase::FlowControl => write!(f, "flow control"),
            TimeoutPhase::ConsecutiveFrame => write!(f, "consecutive frame"),
        }
    }
}

/// Diagnostic server error
#[derive(Debug)]
pub enum DiagError {
    /// Underlying CAN transport failure
    Transport(TransportError),
    /// No bytes were observed within the relevant deadline
    Timeout {
        /// Which wait timed out
        phase: TimeoutPhase,
    },
    /// An ISO-TP framing/sequencing error
    IsoTp(IsoTpError),
    /// The ECU returned a well-formed negative response
    UdsNegative {
        /// Service id that was requested
        service: u8,
        /// Negative response code returned
        code: NegativeResponseCode,
    },
    /// The ECU returned more consecutive `0x78` (response pending) replies
    /// than the configured cap
    PendingAbuse,
    /// A response was received and parsed, but did not match the service
    /// that was requested
    MalformedResponse,
    /// The caller's cancellation token was set while the transaction was
    /// suspended; the transaction was abandoned and the transport left
    /// untouched
    Cancelled,
}

impl fmt::Display for DiagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagError::Transport(e) => write!(f, "transport error: {}", e),
            DiagError::Timeout { phase } => write!(f, "timed out waiting for {}", phase),
            DiagError::IsoTp(e) => write!(f, "ISO-TP error: {}", e),
            DiagError::UdsNegative { service, code } => {
                write!(f, "ECU rejected service 0x{:02X}: {}", service, code)
            }
            DiagError::PendingAbuse => {
                write!(f, "ECU sent too many consecutive response-pending replies")
            }
            DiagError::MalformedResponse => {
                write!(f, "response did not match the requested service")
            }
            DiagError::Cancelled => write!(f, "transaction cancelled by caller"),
        }
    }
}

impl std::error::Error for DiagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiagError::Transport(e) => Some(e),
            DiagError::IsoTp(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for DiagError {
    fn from(e: TransportError) -> Self {
        DiagError::Transport(e)
    }
}

impl From<IsoTpError> for DiagError {
    fn from(e: IsoTpError) -> Self {
        DiagError::IsoTp(e)
    }
}
