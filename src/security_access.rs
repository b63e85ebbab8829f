//! Seed/key `SecurityAccess` (`0x27`) controller
//!
//! Drives the two-step request-seed / compute-key / send-key exchange on top
//! of [crate::client::UdsClient], parameterised by a caller-supplied
//! [KeyDerivation]. This crate ships no real key-derivation algorithm: the
//! source's placeholder algorithms are exactly that, placeholders, so the
//! interface is defined here and the algorithm is always injected.

use crate::client::{CancellationToken, UdsClient};
use crate::error::{DiagError, DiagServerResult};
use crate::transport::FrameTransport;
use crate::uds::request::security_access as request;
use crate::uds::{NegativeResponseCode, UdsResponse};

/// Computes a key from a seed for one security level
///
/// Implemented as a trait rather than a bare `fn` pointer so a closure that
/// captures a vehicle-family constant table (bit rotations, XOR masks) can be
/// used directly, generalizing the teacher's closure-based `UdsSimEcu`
/// callback-injection idiom (`uds/mock.rs`) to key derivation.
pub trait KeyDerivation {
    /// Derives the key bytes to send back for `level` given `seed`
    fn derive(&self, seed: &[u8], level: u8) -> Vec<u8>;
}

impl<F> KeyDerivation for F
where
    F: Fn(&[u8], u8) -> Vec<u8>,
{
    fn derive(&self, seed: &[u8], level: u8) -> Vec<u8> {
        self(seed, level)
    }
}

/// Outcome of one `SecurityAccess` attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityAccessOutcome {
    /// The ECU was already unlocked (seed was all-zero) or accepted the key
    Unlocked,
    /// The ECU rejected the key
    InvalidKey,
    /// Too many incorrect key attempts
    ExceededNumberOfAttempts,
    /// A cooldown period has not yet elapsed
    RequiredTimeDelayNotExpired,
    /// Any other negative response to the send-key step
    Denied {
        /// NRC the ECU returned
        code: NegativeResponseCode,
    },
}

/// Record of one seed/key attempt, kept for auditing and algorithm analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedKeyObservation {
    /// Security level requested
    pub level: u8,
    /// Seed bytes returned by the ECU (empty if the level was already unlocked)
    pub seed: Vec<u8>,
    /// Key bytes sent back (empty if no key was sent)
    pub key: Vec<u8>,
    /// Whether the ECU accepted the attempt
    pub accepted: bool,
    /// NRC on the send-key step, if the ECU rejected it
    pub nrc: Option<NegativeResponseCode>,
}

/// A seed of this length or with every byte `0x00` indicates the ECU is
/// already unlocked at the requested level
fn seed_is_all_zero(seed: &[u8]) -> bool {
    seed.iter().all(|b| *b == 0)
}

/// Runs the request-seed / compute-key / send-key exchange for `level`
/// (must be odd) against `client`, using `key_derivation` to compute the key
/// from the returned seed.
pub fn unlock<T: FrameTransport, K: KeyDerivation>(
    client: &mut UdsClient<T>,
    level: u8,
    key_derivation: &K,
    cancel: &CancellationToken,
) -> DiagServerResult<(SecurityAccessOutcome, SeedKeyObservation)> {
    let seed_req = request::request_seed(level);
    let seed_response = client.transact(seed_req.service_id, seed_req.body, cancel)?;

    let seed = match seed_response {
        UdsResponse::Positive { body, .. } if !body.is_empty() => body[1..].to_vec(),
        UdsResponse::Positive { .. } => return Err(DiagError::MalformedResponse),
        UdsResponse::Negative { service_id, code, .. } => {
            return Err(DiagError::UdsNegative { service: service_id, code })
        }
    };

    if seed_is_all_zero(&seed) {
        return Ok((
            SecurityAccessOutcome::Unlocked,
            SeedKeyObservation {
                level,
                seed,
                key: Vec::new(),
                accepted: true,
                nrc: None,
            },
        ));
    }

    let key = key_derivation.derive(&seed, level);
    let key_req = request::send_key(level, &key);
    let key_response = client.transact(key_req.service_id, key_req.body, cancel)?;

    match key_response {
        UdsResponse::Positive { .. } => Ok((
            SecurityAccessOutcome::Unlocked,
            SeedKeyObservation {
                level,
                seed,
                key,
                accepted: true,
                nrc: None,
            },
        )),
        UdsResponse::Negative { code, .. } => {
            let outcome = match code {
                NegativeResponseCode::InvalidKey => SecurityAccessOutcome::InvalidKey,
                NegativeResponseCode::ExceededNumberOfAttempts => SecurityAccessOutcome::ExceededNumberOfAttempts,
                NegativeResponseCode::RequiredTimeDelayNotExpired => SecurityAccessOutcome::RequiredTimeDelayNotExpired,
                other => SecurityAccessOutcome::Denied { code: other },
            };
            Ok((
                outcome,
                SeedKeyObservation {
                    level,
                    seed,
                    key,
                    accepted: false,
                    nrc: Some(code),
                },
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::{TimingConfig, UdsClient};
    use crate::isotp::EncoderConfig;
    use crate::testing::FakeTransport;
    use crate::transport::{CanFrame, ModuleAddress};

    fn client(transport: FakeTransport) -> UdsClient<FakeTransport> {
        UdsClient::new(
            transport,
            ModuleAddress::standard(0x7E0, 0x7E8),
            TimingConfig::default(),
            EncoderConfig::default(),
        )
    }

    #[test]
    fn s6_unlock_with_nonzero_seed() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x06, 0x67, 0x05, 0xCC, 0x55, 0x4A, 0xF6, 0x00]));
        transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x67, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let derive = |seed: &[u8], _level: u8| {
            assert_eq!(seed, &[0xCC, 0x55, 0x4A, 0xF6]);
            vec![0xB5, 0xD9, 0xF5, 0xC6]
        };
        let (outcome, observation) = unlock(&mut client, 5, &derive, &cancel).unwrap();
        assert_eq!(outcome, SecurityAccessOutcome::Unlocked);
        assert_eq!(observation.seed, vec![0xCC, 0x55, 0x4A, 0xF6]);
        assert_eq!(observation.key, vec![0xB5, 0xD9, 0xF5, 0xC6]);
        assert!(observation.accepted);
    }

    #[test]
    fn seed_of_zeros_shortcuts_without_send_key() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x67, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let derive = |_seed: &[u8], _level: u8| panic!("key derivation must not be called");
        let (outcome, observation) = unlock(&mut client, 5, &derive, &cancel).unwrap();
        assert_eq!(outcome, SecurityAccessOutcome::Unlocked);
        assert!(observation.key.is_empty());
        assert_eq!(client.transport_mut().sent.len(), 1);
    }

    #[test]
    fn invalid_key_is_reported_and_not_retried() {
        let mut transport = FakeTransport::new();
        transport.push_incoming(CanFrame::new(0x7E8, &[0x04, 0x67, 0x05, 0xAA, 0xBB, 0x00, 0x00, 0x00]));
        transport.push_incoming(CanFrame::new(0x7E8, &[0x03, 0x7F, 0x27, 0x35, 0x00, 0x00, 0x00, 0x00]));
        let mut client = client(transport);
        let cancel = CancellationToken::new();
        let derive = |_seed: &[u8], _level: u8| vec![0x00, 0x00];
        let (outcome, observation) = unlock(&mut client, 5, &derive, &cancel).unwrap();
        assert_eq!(outcome, SecurityAccessOutcome::InvalidKey);
        assert!(!observation.accepted);
        assert_eq!(observation.nrc, Some(NegativeResponseCode::InvalidKey));
        assert_eq!(client.transport_mut().sent.len(), 2);
    }
}
