//! `TesterPresent` (`0x3E`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Builds `0x3E, suppress ? 0x80 : 0x00`
pub fn build(suppress_positive_response: bool) -> UdsRequest {
    let sub = if suppress_positive_response { 0x80 } else { 0x00 };
    UdsRequest::new(UdsServiceId::TesterPresent.as_u8(), vec![sub])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_does_not_suppress() {
        assert_eq!(build(false).to_bytes(), vec![0x3E, 0x00]);
    }

    #[test]
    fn suppress_sets_high_bit() {
        assert_eq!(build(true).to_bytes(), vec![0x3E, 0x80]);
    }
}
