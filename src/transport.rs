//! External transport boundary
//!
//! This module defines the capability the core consumes to talk to a CAN
//! bus. It owns no hardware driver of its own (see `spec.md` §1's Non-goals);
//! a caller supplies an implementation backed by socketCAN, J2534, a USB-CAN
//! dongle, or a simulation, and hands it to [crate::client::UdsClient].

use std::time::Instant;

use crate::error::TransportError;

/// Result type for [FrameTransport] operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Maximum number of data bytes a classic CAN frame can carry
pub const MAX_CAN_PAYLOAD: usize = 8;

/// One CAN frame: an arbitration id and up to 8 data bytes
///
/// The arbitration id is either 11-bit (`<= 0x7FF`) or 29-bit
/// (`<= 0x1FFF_FFFF`); which one is in use is a property of the channel, not
/// of any individual frame, so it is not stored here (see [Addressing]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    arbitration_id: u32,
    data: Vec<u8>,
}

impl CanFrame {
    /// Builds a new CAN frame
    ///
    /// ## Panics
    /// Panics if `data` is longer than [MAX_CAN_PAYLOAD] bytes - this is a
    /// programmer error in the encoder, never a function of wire input.
    pub fn new(arbitration_id: u32, data: &[u8]) -> Self {
        assert!(
            data.len() <= MAX_CAN_PAYLOAD,
            "CAN frame payload must be <= {} bytes, got {}",
            MAX_CAN_PAYLOAD,
            data.len()
        );
        Self {
            arbitration_id,
            data: data.to_vec(),
        }
    }

    /// Arbitration id of the frame
    pub fn arbitration_id(&self) -> u32 {
        self.arbitration_id
    }

    /// Data bytes of the frame (0..=8 bytes)
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// CAN arbitration id width used by a channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// 11-bit (standard) arbitration ids
    Standard11Bit,
    /// 29-bit (extended) arbitration ids
    Extended29Bit,
}

/// Immutable identity of one ECU on the bus
///
/// Requests are transmitted to `request_id`; responses are only accepted
/// from `response_id`. The core never enumerates modules - callers supply
/// one [ModuleAddress] per transaction. For the common FCA 11-bit pattern,
/// `request_id` is in `0x7E0..=0x7E7` and `response_id = request_id + 8`,
/// but the core does not enforce this and accepts any pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModuleAddress {
    /// Arbitration id requests are sent to
    pub request_id: u32,
    /// Arbitration id responses are accepted from
    pub response_id: u32,
    /// Arbitration id width in use on this channel
    pub addressing: Addressing,
}

impl ModuleAddress {
    /// Convenience constructor for the common 11-bit case
    pub fn standard(request_id: u32, response_id: u32) -> Self {
        Self {
            request_id,
            response_id,
            addressing: Addressing::Standard11Bit,
        }
    }

    /// Convenience constructor for 29-bit addressing
    pub fn extended(request_id: u32, response_id: u32) -> Self {
        Self {
            request_id,
            response_id,
            addressing: Addressing::Extended29Bit,
        }
    }
}

/// Capability boundary between the diagnostic core and a physical CAN
/// channel
///
/// The core treats a transport as single-threaded per channel: it never
/// issues a concurrent `send` and `recv` on the same channel itself (see
/// `spec.md` §5). A host holding multiple channels that share one physical
/// bus is responsible for serialising access across them.
pub trait FrameTransport {
    /// Transmits one frame
    ///
    /// May block until the underlying driver accepts the frame.
    fn send(&mut self, frame: &CanFrame) -> TransportResult<()>;

    /// Waits for the next frame matching the channel's acceptance filter
    ///
    /// Returns `Ok(None)` if `deadline` elapses with nothing received.
    fn recv(&mut self, deadline: Instant) -> TransportResult<Option<CanFrame>>;

    /// Restricts `recv` to frames whose arbitration id equals `accept`
    fn set_filter(&mut self, accept: u32);
}
