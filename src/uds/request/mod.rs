//! Request builders: one pure function per supported UDS service, following
//! the teacher's convention of one file per service family.

pub mod clear_diagnostic_information;
pub mod communication_control;
pub mod diagnostic_session_control;
pub mod ecu_reset;
pub mod read_data_by_identifier;
pub mod read_dtc_information;
pub mod routine_control;
pub mod security_access;
pub mod tester_present;
pub mod write_data_by_identifier;
