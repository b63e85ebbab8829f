//! `RoutineControl` (`0x31`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// `RoutineControl` sub-function
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoutineControlType {
    /// `0x01` - start the routine
    Start,
    /// `0x02` - stop the routine
    Stop,
    /// `0x03` - request the routine's results
    RequestResults,
}

impl From<RoutineControlType> for u8 {
    fn from(sub: RoutineControlType) -> Self {
        match sub {
            RoutineControlType::Start => 0x01,
            RoutineControlType::Stop => 0x02,
            RoutineControlType::RequestResults => 0x03,
        }
    }
}

/// Builds `0x31, sub, hi, lo, params...`
pub fn build(sub: RoutineControlType, routine_id: u16, params: &[u8]) -> UdsRequest {
    let mut body = Vec::with_capacity(3 + params.len());
    body.push(sub.into());
    body.push((routine_id >> 8) as u8);
    body.push(routine_id as u8);
    body.extend_from_slice(params);
    UdsRequest::new(UdsServiceId::RoutineControl.as_u8(), body)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_start_routine_request() {
        let req = build(RoutineControlType::Start, 0x0203, &[0xFF]);
        assert_eq!(req.to_bytes(), vec![0x31, 0x01, 0x02, 0x03, 0xFF]);
    }
}
