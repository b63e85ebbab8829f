//! `EcuReset` (`0x11`) request builder

use crate::uds::{UdsRequest, UdsServiceId};

/// Reset type, sent as the sub-function byte
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EcuResetType {
    /// `0x01` - power-cycle the ECU
    HardReset,
    /// `0x02` - turn the key off
    KeyOffOnReset,
    /// `0x03` - restart the ECU's software without a power cycle
    SoftReset,
    /// Manufacturer-specific reset kind
    VendorSpecific(u8),
}

impl From<EcuResetType> for u8 {
    fn from(kind: EcuResetType) -> Self {
        match kind {
            EcuResetType::HardReset => 0x01,
            EcuResetType::KeyOffOnReset => 0x02,
            EcuResetType::SoftReset => 0x03,
            EcuResetType::VendorSpecific(v) => v,
        }
    }
}

/// Builds `0x11, sub`
pub fn build(kind: EcuResetType) -> UdsRequest {
    UdsRequest::new(UdsServiceId::EcuReset.as_u8(), vec![kind.into()])
}
