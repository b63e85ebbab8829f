//! `SecurityAccess` (`0x27`) request builders
//!
//! This module only builds the two request byte layouts; the seed/key state
//! machine lives in [crate::security_access].

use crate::uds::{UdsRequest, UdsServiceId};

/// Builds `0x27, level` (`level` is the odd request-seed sub-function)
pub fn request_seed(level: u8) -> UdsRequest {
    UdsRequest::new(UdsServiceId::SecurityAccess.as_u8(), vec![level])
}

/// Builds `0x27, level+1, key...`
pub fn send_key(level: u8, key: &[u8]) -> UdsRequest {
    let mut body = Vec::with_capacity(1 + key.len());
    body.push(level + 1);
    body.extend_from_slice(key);
    UdsRequest::new(UdsServiceId::SecurityAccess.as_u8(), body)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_request_seed() {
        assert_eq!(request_seed(0x05).to_bytes(), vec![0x27, 0x05]);
    }

    #[test]
    fn builds_send_key() {
        assert_eq!(
            send_key(0x05, &[0xB5, 0xD9, 0xF5, 0xC6]).to_bytes(),
            vec![0x27, 0x06, 0xB5, 0xD9, 0xF5, 0xC6]
        );
    }
}
