use gnat_msg::{BuildError, Code, ParseError};

/// Result of every public operation in this crate: a definite success
/// length (or value) or a definite error classification.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong with a CoAP exchange.
///
/// The transport's own error value is logged where it occurs and
/// flattened here, so that callers match on classifications rather than
/// on platform error types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
  /// The socket failed to bind, send or receive
  Network,

  /// No matching response arrived before the retry budget was exhausted
  TimedOut,

  /// A datagram arrived that claimed to be our response but could not
  /// be parsed
  MessageInvalid(ParseError),

  /// A block-wise response echoed a different block number than the one
  /// requested.
  ///
  /// Fatal to the transfer; the caller may restart it from block 0.
  BlockMismatch {
    /// The block number we asked for
    expected: u32,
    /// The block number the server reported
    actual: u32,
  },

  /// The remote answered with a Reset message: it received the request
  /// but could not process it
  Reset,

  /// A block transfer round was answered with an error response
  /// (4.xx / 5.xx). The transfer state is left untouched.
  Server(Code),

  /// The caller's reassembly buffer cannot hold the payload
  BufferTooSmall,

  /// Not an absolute `coap://` URL
  InvalidUrl,

  /// The request did not fit in the caller's buffer while encoding
  Encoding(BuildError),

  /// The clock failed to report the time
  Clock,
}

impl From<ParseError> for Error {
  fn from(e: ParseError) -> Self {
    Self::MessageInvalid(e)
  }
}

impl From<BuildError> for Error {
  fn from(e: BuildError) -> Self {
    Self::Encoding(e)
  }
}

impl From<embedded_time::clock::Error> for Error {
  fn from(_: embedded_time::clock::Error) -> Self {
    Self::Clock
  }
}
