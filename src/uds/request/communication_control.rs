//! `CommunicationControl` (`0x28`) request builder
//!
//! Reimplemented locally rather than adopting the `automotive_diag` crate's
//! enumerations, see `DESIGN.md`.

use crate::uds::{UdsRequest, UdsServiceId};

/// What to enable/disable
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlType {
    /// `0x00` - enable Rx and Tx
    EnableRxAndTx,
    /// `0x01` - enable Rx, disable Tx
    EnableRxDisableTx,
    /// `0x02` - disable Rx, enable Tx
    DisableRxEnableTx,
    /// `0x03` - disable Rx and Tx
    DisableRxAndTx,
}

impl From<ControlType> for u8 {
    fn from(ct: ControlType) -> Self {
        match ct {
            ControlType::EnableRxAndTx => 0x00,
            ControlType::EnableRxDisableTx => 0x01,
            ControlType::DisableRxEnableTx => 0x02,
            ControlType::DisableRxAndTx => 0x03,
        }
    }
}

/// Which communication channels the control applies to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommunicationType {
    /// `0x01` - normal communication messages
    NormalCommunication,
    /// `0x02` - network management messages
    NetworkManagementCommunication,
    /// `0x03` - both
    NormalAndNetworkManagementCommunication,
}

impl From<CommunicationType> for u8 {
    fn from(ct: CommunicationType) -> Self {
        match ct {
            CommunicationType::NormalCommunication => 0x01,
            CommunicationType::NetworkManagementCommunication => 0x02,
            CommunicationType::NormalAndNetworkManagementCommunication => 0x03,
        }
    }
}

/// Builds `0x28, control_type, communication_type`
pub fn build(control_type: ControlType, communication_type: CommunicationType) -> UdsRequest {
    UdsRequest::new(
        UdsServiceId::CommunicationControl.as_u8(),
        vec![control_type.into(), communication_type.into()],
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_disable_rx_and_tx_request() {
        let req = build(
            ControlType::DisableRxAndTx,
            CommunicationType::NormalCommunication,
        );
        assert_eq!(req.to_bytes(), vec![0x28, 0x03, 0x01]);
    }
}
