//! `ReadDataByIdentifier` (`0x22`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Builds `0x22, hi1, lo1, hi2, lo2, ...` for one or more 16-bit DIDs
///
/// ## Panics
/// Panics if `dids` is empty - a request with no identifiers is meaningless
/// and is a programmer error, not a wire condition.
pub fn build(dids: &[u16]) -> UdsRequest {
    assert!(!dids.is_empty(), "ReadDataByIdentifier needs at least one DID");
    let mut body = Vec::with_capacity(dids.len() * 2);
    for did in dids {
        body.push((did >> 8) as u8);
        body.push(*did as u8);
    }
    UdsRequest::new(UdsServiceId::ReadDataByIdentifier.as_u8(), body)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_single_did_request() {
        let req = build(&[0xF190]);
        assert_eq!(req.to_bytes(), vec![0x22, 0xF1, 0x90]);
    }

    #[test]
    fn builds_multi_did_request() {
        let req = build(&[0xF190, 0xF18C]);
        assert_eq!(req.to_bytes(), vec![0x22, 0xF1, 0x90, 0xF1, 0x8C]);
    }
}
