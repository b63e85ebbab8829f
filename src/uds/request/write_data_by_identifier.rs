//! `WriteDataByIdentifier` (`0x2E`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Builds `0x2E, hi, lo, data...`
pub fn build(did: u16, data: &[u8]) -> UdsRequest {
    let mut body = Vec::with_capacity(2 + data.len());
    body.push((did >> 8) as u8);
    body.push(did as u8);
    body.extend_from_slice(data);
    UdsRequest::new(UdsServiceId::WriteDataByIdentifier.as_u8(), body)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_write_request() {
        let req = build(0xF190, &[0x57, 0x30, 0x4C]);
        assert_eq!(req.to_bytes(), vec![0x2E, 0xF1, 0x90, 0x57, 0x30, 0x4C]);
    }
}
