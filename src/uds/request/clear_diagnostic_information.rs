//! `ClearDiagnosticInformation` (`0x14`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Sentinel group meaning "all groups"
pub const GROUP_ALL: u32 = 0xFF_FFFF;

/// Builds `0x14, group[2], group[1], group[0]` (big-endian 24-bit group)
pub fn build(group: u32) -> UdsRequest {
    let group = group & 0x00FF_FFFF;
    UdsRequest::new(
        UdsServiceId::ClearDiagnosticInformation.as_u8(),
        vec![(group >> 16) as u8, (group >> 8) as u8, group as u8],
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_clear_all_request() {
        assert_eq!(build(GROUP_ALL).to_bytes(), vec![0x14, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn masks_group_to_24_bits() {
        assert_eq!(build(0xFF00_0000).to_bytes(), vec![0x14, 0x00, 0x00, 0x00]);
    }
}
