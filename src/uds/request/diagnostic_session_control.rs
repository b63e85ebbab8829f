//! `DiagnosticSessionControl` (`0x10`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Diagnostic session type, sent as the sub-function byte
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiagnosticSessionType {
    /// `0x01` - the session active by default after power-on
    Default,
    /// `0x02` - manufacturer-defined programming session (flashing)
    Programming,
    /// `0x03` - extended diagnostic session, unlocks most services
    Extended,
    /// `0x04` - safety system diagnostic session
    SafetySystem,
    /// Manufacturer- or supplier-specific session id
    VendorSpecific(u8),
}

impl From<DiagnosticSessionType> for u8 {
    fn from(session: DiagnosticSessionType) -> Self {
        match session {
            DiagnosticSessionType::Default => 0x01,
            DiagnosticSessionType::Programming => 0x02,
            DiagnosticSessionType::Extended => 0x03,
            DiagnosticSessionType::SafetySystem => 0x04,
            DiagnosticSessionType::VendorSpecific(v) => v,
        }
    }
}

/// Builds `0x10, session`
pub fn build(session: DiagnosticSessionType) -> UdsRequest {
    UdsRequest::new(
        UdsServiceId::DiagnosticSessionControl.as_u8(),
        vec![session.into()],
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_extended_session_request() {
        let req = build(DiagnosticSessionType::Extended);
        assert_eq!(req.to_bytes(), vec![0x10, 0x03]);
    }
}
