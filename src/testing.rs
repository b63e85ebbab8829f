//! In-memory [FrameTransport] used by this crate's own tests
//!
//! Grounded on the teacher's closure-driven `UdsSimEcu` fixture
//! (`uds/mock.rs`) and `tests/software_isotp_sim.rs`'s fake channel, adapted
//! to the new trait shape: a queue of frames to hand back from `recv`, and a
//! record of everything sent.

use std::time::Instant;

use crate::transport::{CanFrame, FrameTransport, TransportResult};

/// A [FrameTransport] backed by an in-memory queue
///
/// Frames pushed with [Self::push_incoming] are returned from [Self::recv]
/// in order; every frame handed to [Self::send] is recorded in
/// [Self::sent] for assertions.
#[derive(Debug, Default)]
pub struct FakeTransport {
    /// Frames queued up to be returned by [Self::recv], in order
    pub incoming: std::collections::VecDeque<CanFrame>,
    /// Every frame passed to [Self::send], in order
    pub sent: Vec<CanFrame>,
    filter: Option<u32>,
}

impl FakeTransport {
    /// Builds an empty fake transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a frame to be returned by a future [Self::recv]
    pub fn push_incoming(&mut self, frame: CanFrame) {
        self.incoming.push_back(frame);
    }
}

impl FrameTransport for FakeTransport {
    fn send(&mut self, frame: &CanFrame) -> TransportResult<()> {
        self.sent.push(frame.clone());
        Ok(())
    }

    fn recv(&mut self, _deadline: Instant) -> TransportResult<Option<CanFrame>> {
        Ok(loop {
            match self.incoming.pop_front() {
                Some(frame) => match self.filter {
                    Some(f) if f != frame.arbitration_id() => continue,
                    _ => break Some(frame),
                },
                None => break None,
            }
        })
    }

    fn set_filter(&mut self, accept: u32) {
        self.filter = Some(accept);
    }
}
