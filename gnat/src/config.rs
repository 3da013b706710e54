use embedded_time::duration::Milliseconds;

use crate::retry::{Attempts, Strategy};

/// Retransmission parameters for confirmable exchanges.
///
/// The defaults are the RFC7252 transmission parameters:
/// `ACK_TIMEOUT` 2 seconds, `ACK_RANDOM_FACTOR` 1.5, `MAX_RETRANSMIT` 4.
///
/// # Related
/// - [RFC7252#section-4.8 Transmission Parameters](https://datatracker.ietf.org/doc/html/rfc7252#section-4.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// `ACK_TIMEOUT`: initial wait before the first retransmission
  pub ack_timeout: Milliseconds<u64>,
  /// `ACK_TIMEOUT * ACK_RANDOM_FACTOR`: upper bound for the jittered
  /// initial wait
  pub ack_timeout_max: Milliseconds<u64>,
  /// `MAX_RETRANSMIT`: how many times a confirmable request is resent
  /// before the transaction fails with a timeout
  pub max_retransmit: u16,
  /// How long to wait for the response to a non-confirmable request
  /// that expects one. Non-confirmables are never retransmitted.
  pub non_timeout: Milliseconds<u64>,
}

impl Default for Config {
  fn default() -> Self {
    Self { ack_timeout: Milliseconds(2_000),
           ack_timeout_max: Milliseconds(3_000),
           max_retransmit: 4,
           non_timeout: Milliseconds(2_000) }
  }
}

impl Config {
  /// The retry schedule for a confirmable request
  pub(crate) fn con_strategy(&self) -> Strategy {
    Strategy::Exponential { init_min: self.ack_timeout,
                            init_max: self.ack_timeout_max }
  }

  /// The (single-attempt) schedule for a non-confirmable request
  pub(crate) fn non_strategy(&self) -> Strategy {
    Strategy::Delay { min: self.non_timeout,
                      max: self.non_timeout }
  }

  /// Total attempts for a confirmable request (1 initial + retransmits)
  pub(crate) fn con_attempts(&self) -> Attempts {
    Attempts(self.max_retransmit + 1)
  }
}
