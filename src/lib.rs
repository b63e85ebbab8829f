#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_imports,
    unused_import_braces,
    unused_qualifications
)]

//! A diagnostic client core for automotive ECUs speaking Unified Diagnostic
//! Services (UDS, ISO 14229) over an ISO 15765-2 (ISO-TP) transport on CAN.
//!
//! This crate covers exactly three coupled subsystems:
//!
//! 1. **ISO-TP segmentation/reassembly** ([isotp]) - the frame-level
//!    transport that carries arbitrary-length UDS payloads over fixed
//!    8-byte CAN frames with flow control.
//! 2. **UDS service engine** ([uds]) - request construction, response
//!    classification (including the `0x78` response-pending retry
//!    protocol), and diagnostic-trouble-code decoding ([dtc]).
//! 3. **Seed/key security access** ([security_access]) - the request-seed /
//!    send-key exchange, parameterised by a pluggable [security_access::KeyDerivation].
//!
//! The core does not ship a CAN driver: callers implement
//! [transport::FrameTransport] against socketCAN, J2534, a USB-CAN dongle,
//! or a test double, and hand it to [client::UdsClient]. It does not decide
//! which ECU to talk to (callers supply a [transport::ModuleAddress] per
//! transaction), does not schedule its own keep-alives (callers drive
//! [client::UdsClient::tester_present]), and does not persist state across
//! process lifetime.

pub mod client;
pub mod dtc;
pub mod error;
pub mod isotp;
pub mod security_access;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;
pub mod uds;

pub use client::{CancellationToken, DataByIdentifier, TimingConfig, UdsClient};
pub use dtc::{DiagnosticTroubleCode, DtcStatusMask};
pub use error::{DiagError, DiagServerResult, TimeoutPhase, TransportError};
pub use isotp::{DecoderConfig, EncoderConfig, IsoTpError};
pub use security_access::{KeyDerivation, SecurityAccessOutcome, SeedKeyObservation};
pub use transport::{Addressing, CanFrame, FrameTransport, ModuleAddress};
pub use uds::{NegativeResponseCode, UdsRequest, UdsResponse};
