use tinyvec::ArrayVec;

/// Message ID
///
/// 16-bit unsigned integer in network byte order, used to detect
/// duplicates and to pair Acknowledgement / Reset messages with the
/// Confirmable / Non-confirmable message they belong to.
///
/// For the pairing of requests with responses across retransmissions,
/// see [`Token`].
///
/// # Related
/// - [RFC7252#section-3 Message Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3)
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Id(pub u16);

/// Message type
///
/// # Related
/// - [RFC7252#section-4.2 Messages Transmitted Reliably](https://datatracker.ietf.org/doc/html/rfc7252#section-4.2)
/// - [RFC7252#section-4.3 Messages Transmitted without Reliability](https://datatracker.ietf.org/doc/html/rfc7252#section-4.3)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Type {
  /// Some response is expected; the message will be retransmitted
  /// until an Ack (or Reset) with a matching [`Id`] arrives.
  Con,
  /// No response is expected and the message is sent exactly once.
  Non,
  /// Acknowledges receipt of a Con message with the same [`Id`].
  Ack,
  /// The message with this [`Id`] was received but could not be processed.
  Reset,
}

impl Type {
  /// Parse the 2-bit wire value
  pub fn try_from_u8(b: u8) -> Option<Self> {
    match b {
      | 0 => Some(Self::Con),
      | 1 => Some(Self::Non),
      | 2 => Some(Self::Ack),
      | 3 => Some(Self::Reset),
      | _ => None,
    }
  }

  /// The 2-bit wire value
  pub fn into_u8(self) -> u8 {
    match self {
      | Self::Con => 0,
      | Self::Non => 1,
      | Self::Ack => 2,
      | Self::Reset => 3,
    }
  }
}

/// Protocol version. Always 1.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version(pub u8);

impl Default for Version {
  fn default() -> Self {
    Version(1)
  }
}

/// Message token
///
/// 0-8 opaque bytes binding a response to its request, independent of
/// the message [`Id`]. An empty token is valid (and common for pings).
///
/// # Related
/// - [RFC7252#section-5.3.1 Token](https://datatracker.ietf.org/doc/html/rfc7252#section-5.3.1)
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Copy an arbitrary byte slice into a Token, truncating to 8 bytes.
  pub fn opaque(data: &[u8]) -> Token {
    Token(data.iter().copied().take(8).collect())
  }

  /// The token bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn type_wire_values_roundtrip() {
    for b in 0..4u8 {
      assert_eq!(Type::try_from_u8(b).unwrap().into_u8(), b);
    }
    assert_eq!(Type::try_from_u8(4), None);
  }

  #[test]
  fn token_opaque_truncates() {
    let tok = Token::opaque(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    assert_eq!(tok.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
  }
}
