//! Diagnostic Trouble Code (DTC) representation and decoding
//!
//! A DTC is a 24-bit fault identifier plus an 8-bit status byte. The display
//! form follows ISO 15031-6: `<prefix><d1><d2><hh>`, e.g. `P0300`.

use bitflags::bitflags;

bitflags! {
    /// DTC status byte, bit 0 is the least significant bit of the wire byte
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DtcStatusMask: u8 {
        /// Fault is present right now
        const TEST_FAILED = 0b0000_0001;
        /// Fault has failed at least once during the current operation cycle
        const TEST_FAILED_THIS_OPERATION_CYCLE = 0b0000_0010;
        /// Fault is pending confirmation
        const PENDING_DTC = 0b0000_0100;
        /// Fault has been confirmed
        const CONFIRMED_DTC = 0b0000_1000;
        /// Test for this DTC has not completed since the last clear
        const TEST_NOT_COMPLETED_SINCE_LAST_CLEAR = 0b0001_0000;
        /// Fault has failed at least once since the last clear
        const TEST_FAILED_SINCE_LAST_CLEAR = 0b0010_0000;
        /// Test for this DTC has not completed this operation cycle
        const TEST_NOT_COMPLETED_THIS_OPERATION_CYCLE = 0b0100_0000;
        /// ECU wants the MIL (warning lamp) illuminated because of this DTC
        const WARNING_INDICATOR_REQUESTED = 0b1000_0000;
    }
}

impl From<u8> for DtcStatusMask {
    fn from(raw: u8) -> Self {
        DtcStatusMask::from_bits_truncate(raw)
    }
}

impl From<DtcStatusMask> for u8 {
    fn from(mask: DtcStatusMask) -> Self {
        mask.bits()
    }
}

/// Letter prefix decoded from a DTC's top two bits, per ISO 15031-6
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtcPrefix {
    /// Powertrain
    P,
    /// Chassis
    C,
    /// Body
    B,
    /// Network/communication
    U,
}

impl DtcPrefix {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => DtcPrefix::P,
            1 => DtcPrefix::C,
            2 => DtcPrefix::B,
            3 => DtcPrefix::U,
            _ => unreachable!("bits [23:22] are masked to 2 bits"),
        }
    }

    fn as_char(self) -> char {
        match self {
            DtcPrefix::P => 'P',
            DtcPrefix::C => 'C',
            DtcPrefix::B => 'B',
            DtcPrefix::U => 'U',
        }
    }
}

/// One diagnostic trouble code: a 24-bit fault identifier and its status
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticTroubleCode {
    raw_code: u32,
    status: DtcStatusMask,
}

impl DiagnosticTroubleCode {
    /// Builds a DTC from its 24-bit wire code and status byte
    ///
    /// `raw_code` is masked to 24 bits; any higher bits are ignored.
    pub fn new(raw_code: u32, status: DtcStatusMask) -> Self {
        Self {
            raw_code: raw_code & 0x00FF_FFFF,
            status,
        }
    }

    /// Builds a DTC from the three wire bytes (high, mid, low) and status byte
    pub fn from_bytes(code_hi: u8, code_mid: u8, code_lo: u8, status: u8) -> Self {
        let raw_code = ((code_hi as u32) << 16) | ((code_mid as u32) << 8) | code_lo as u32;
        Self::new(raw_code, DtcStatusMask::from(status))
    }

    /// 24-bit wire code
    pub fn raw_code(&self) -> u32 {
        self.raw_code
    }

    /// Status bit-set
    pub fn status(&self) -> DtcStatusMask {
        self.status
    }

    fn prefix(&self) -> DtcPrefix {
        DtcPrefix::from_bits(((self.raw_code >> 22) & 0b11) as u8)
    }

    fn digit1(&self) -> u8 {
        ((self.raw_code >> 20) & 0b11) as u8
    }

    fn digit2(&self) -> u8 {
        ((self.raw_code >> 16) & 0x0F) as u8
    }

    fn hh(&self) -> u8 {
        ((self.raw_code >> 8) & 0xFF) as u8
    }

    /// True if [DtcStatusMask::CONFIRMED_DTC] is set
    pub fn confirmed(&self) -> bool {
        self.status.contains(DtcStatusMask::CONFIRMED_DTC)
    }

    /// True if [DtcStatusMask::WARNING_INDICATOR_REQUESTED] is set (MIL on)
    pub fn mil_on(&self) -> bool {
        self.status.contains(DtcStatusMask::WARNING_INDICATOR_REQUESTED)
    }

    /// Formats the DTC as `<prefix><d1><d2><hh>`, e.g. `P0300`
    ///
    /// `digit1` is printed decimal (0-3), `digit2` and `hh` are printed hex,
    /// matching the extended ISO 15031 codes (e.g. `P0A12`) rather than
    /// treating the whole 16 low bits as the suffix.
    pub fn display(&self) -> String {
        format!(
            "{}{}{:X}{:02X}",
            self.prefix().as_char(),
            self.digit1(),
            self.digit2(),
            self.hh()
        )
    }
}

impl std::fmt::Display for DiagnosticTroubleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_p0300() {
        let dtc = DiagnosticTroubleCode::from_bytes(0x03, 0x00, 0x00, 0x08);
        assert_eq!(dtc.display(), "P0300");
        assert!(dtc.confirmed());
        assert!(!dtc.mil_on());
    }

    #[test]
    fn decodes_p0171() {
        let dtc = DiagnosticTroubleCode::from_bytes(0x01, 0x71, 0x00, 0x08);
        assert_eq!(dtc.display(), "P0171");
    }

    #[test]
    fn decodes_each_prefix() {
        assert!(DiagnosticTroubleCode::new(0b00 << 22, DtcStatusMask::empty())
            .display()
            .starts_with('P'));
        assert!(DiagnosticTroubleCode::new(0b01 << 22, DtcStatusMask::empty())
            .display()
            .starts_with('C'));
        assert!(DiagnosticTroubleCode::new(0b10 << 22, DtcStatusMask::empty())
            .display()
            .starts_with('B'));
        assert!(DiagnosticTroubleCode::new(0b11 << 22, DtcStatusMask::empty())
            .display()
            .starts_with('U'));
    }

    #[test]
    fn status_mask_roundtrips_through_u8() {
        let raw: u8 = 0b1010_1010;
        let mask = DtcStatusMask::from(raw);
        assert_eq!(u8::from(mask), raw);
    }

    #[test]
    fn display_is_deterministic() {
        for raw in [0x030000u32, 0x017100, 0x0A1234, 0xFFFFFF] {
            let dtc = DiagnosticTroubleCode::new(raw, DtcStatusMask::empty());
            let dtc2 = DiagnosticTroubleCode::new(raw, DtcStatusMask::empty());
            assert_eq!(dtc.display(), dtc2.display());
        }
    }
}
