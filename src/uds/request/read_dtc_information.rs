//! `ReadDtcInformation` (`0x19`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// `ReadDtcInformation` sub-functions this core builds requests for
///
/// ISO 14229 defines a larger catalogue (snapshot records, severity masks,
/// extended data); only the status-mask family is in scope here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DtcSubFunction {
    /// `0x01` - count of DTCs matching a status mask
    ReportNumberOfDtcByStatusMask = 0x01,
    /// `0x02` - DTCs matching a status mask, with their own status bytes
    ReportDtcByStatusMask = 0x02,
}

/// Builds `0x19, sub, status_mask`
pub fn build(sub: DtcSubFunction, status_mask: u8) -> UdsRequest {
    UdsRequest::new(
        UdsServiceId::ReadDtcInformation.as_u8(),
        vec![sub as u8, status_mask],
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_report_by_status_mask_request() {
        let req = build(DtcSubFunction::ReportDtcByStatusMask, 0xFF);
        assert_eq!(req.to_bytes(), vec![0x19, 0x02, 0xFF]);
    }
}
