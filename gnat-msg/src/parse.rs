use tinyvec::ArrayVec;

use crate::block::Block;
use crate::code::Code;
use crate::opt::PAYLOAD_MARKER;
use crate::ty::{Id, Token, Type, Version};

/// The most options a single message may carry.
///
/// Datagrams with more parse to [`ParseError::TooManyOptions`].
pub const MAX_OPTS: usize = 16;

/// Errors encounterable while reading a message from a datagram
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseError {
  /// Reached end of the datagram before parsing was finished
  UnexpectedEndOfStream,

  /// The version field was not 1
  InvalidVersion(u8),

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// Option Delta was set to 15, which is reserved.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is reserved.
  ValueLengthReservedValue(u8),

  /// Parsed more options than reserved capacity ([`MAX_OPTS`])
  TooManyOptions(usize),
}

/// Parsed option record; the value stays in the datagram buffer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
struct OptRef {
  number: u16,
  off: u16,
  len: u16,
}

/// A read-only view of a CoAP message over a received datagram.
///
/// Parsing resolves the option deltas into absolute option numbers and
/// locates the payload, but copies nothing: token, option values and
/// payload are all slices into the datagram the caller received into.
///
/// The view is only as alive as the buffer; once the buffer is reused
/// for the next operation the `Packet` is gone with it, which is exactly
/// the shared-buffer contract the borrow checker enforces here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet<'b> {
  buf: &'b [u8],
  ver: Version,
  ty: Type,
  code: Code,
  id: Id,
  token: Token,
  opts: ArrayVec<[OptRef; MAX_OPTS]>,
  payload_off: u16,
  payload_len: u16,
}

impl<'b> Packet<'b> {
  /// Read a message from a received datagram.
  pub fn parse(buf: &'b [u8]) -> Result<Packet<'b>, ParseError> {
    if buf.len() < 4 {
      return Err(ParseError::UnexpectedEndOfStream);
    }

    let ver = buf[0] >> 6;
    if ver != 1 {
      return Err(ParseError::InvalidVersion(ver));
    }

    let ty = match (buf[0] >> 4) & 0b11 {
      | 0 => Type::Con,
      | 1 => Type::Non,
      | 2 => Type::Ack,
      | _ => Type::Reset,
    };

    let tkl = buf[0] & 0b1111;
    if tkl > 8 {
      return Err(ParseError::InvalidTokenLength(tkl));
    }

    let code = Code::from_u8(buf[1]);
    let id = Id(u16::from_be_bytes([buf[2], buf[3]]));

    let token_end = 4 + tkl as usize;
    if buf.len() < token_end {
      return Err(ParseError::UnexpectedEndOfStream);
    }
    let token = Token::opaque(&buf[4..token_end]);

    let mut opts = ArrayVec::<[OptRef; MAX_OPTS]>::new();
    let mut number = 0u16;
    let mut pos = token_end;
    let mut payload_off = buf.len();

    while pos < buf.len() {
      let head = buf[pos];
      if head == PAYLOAD_MARKER {
        // A marker followed by a zero-length payload is a format error
        if pos + 1 >= buf.len() {
          return Err(ParseError::UnexpectedEndOfStream);
        }
        payload_off = pos + 1;
        break;
      }

      let (delta, after_delta) =
        take_ext(buf, pos + 1, head >> 4, ParseError::OptionDeltaReservedValue(15))?;
      let (len, after_len) =
        take_ext(buf, after_delta, head & 0b1111, ParseError::ValueLengthReservedValue(15))?;
      pos = after_len;

      if pos + len as usize > buf.len() {
        return Err(ParseError::UnexpectedEndOfStream);
      }

      number = number.saturating_add(delta);
      if opts.len() == MAX_OPTS {
        return Err(ParseError::TooManyOptions(MAX_OPTS + 1));
      }
      opts.push(OptRef { number,
                         off: pos as u16,
                         len });
      pos += len as usize;
    }

    Ok(Packet { buf,
                ver: Version(ver),
                ty,
                code,
                id,
                token,
                opts,
                payload_off: payload_off as u16,
                payload_len: (buf.len() - payload_off) as u16 })
  }

  /// Protocol version (always 1 for a successfully parsed message)
  pub fn ver(&self) -> Version {
    self.ver
  }

  /// Message type
  pub fn ty(&self) -> Type {
    self.ty
  }

  /// Request method / response status
  pub fn code(&self) -> Code {
    self.code
  }

  /// Message ID
  pub fn id(&self) -> Id {
    self.id
  }

  /// Message token
  pub fn token(&self) -> Token {
    self.token
  }

  /// Where the payload sits within the parsed datagram.
  ///
  /// Useful when the datagram buffer outlives this view and the caller
  /// wants to relocate the payload within it.
  pub fn payload_range(&self) -> core::ops::Range<usize> {
    self.payload_off as usize..self.payload_off as usize + self.payload_len as usize
  }

  /// The payload slice (empty when the message has no payload marker)
  pub fn payload(&self) -> &'b [u8] {
    let buf = self.buf;
    &buf[self.payload_off as usize..self.payload_off as usize + self.payload_len as usize]
  }

  /// All options, in wire order, tagged with their absolute option number
  pub fn opts(&self) -> impl Iterator<Item = (u16, &'b [u8])> + '_ {
    let buf = self.buf;
    self.opts
        .iter()
        .map(move |o| (o.number, &buf[o.off as usize..o.off as usize + o.len as usize]))
  }

  /// Value of the first occurrence of option `number`
  pub fn opt(&self, number: u16) -> Option<&'b [u8]> {
    self.opts().find(|(n, _)| *n == number).map(|(_, v)| v)
  }

  /// Option `number` read as a big-endian unsigned integer.
  ///
  /// `None` if the option is absent or longer than 4 bytes.
  pub fn opt_u32(&self, number: u16) -> Option<u32> {
    self.opt(number)
        .filter(|v| v.len() <= 4)
        .map(|v| v.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
  }

  /// The Block1 option, if present
  pub fn block1(&self) -> Option<Block> {
    self.opt_u32(crate::opt::BLOCK1).map(Block::from_value)
  }

  /// The Block2 option, if present
  pub fn block2(&self) -> Option<Block> {
    self.opt_u32(crate::opt::BLOCK2).map(Block::from_value)
  }
}

/// Resolve a delta/length nibble, consuming extension bytes as needed.
fn take_ext(buf: &[u8],
            pos: usize,
            nib: u8,
            reserved: ParseError)
            -> Result<(u16, usize), ParseError> {
  match nib {
    | 0..=12 => Ok((nib as u16, pos)),
    | 13 => buf.get(pos)
               .map(|b| (*b as u16 + 13, pos + 1))
               .ok_or(ParseError::UnexpectedEndOfStream),
    | 14 => {
      if pos + 2 > buf.len() {
        return Err(ParseError::UnexpectedEndOfStream);
      }
      Ok((u16::from_be_bytes([buf[pos], buf[pos + 1]]).saturating_add(269), pos + 2))
    },
    | _ => Err(reserved),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::code;
  use crate::opt::CONTENT_FORMAT;

  fn test_dgram() -> Vec<u8> {
    let header: [u8; 4] = 0b01_00_0001_01000101_0000000000000001u32.to_be_bytes();
    let token: [u8; 1] = [254u8];
    let content_format: &[u8] = b"application/json";
    let options: [&[u8]; 2] = [&[0b_1100_1101u8, 0b00000011u8], content_format];
    let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
    [header.as_ref(),
     token.as_ref(),
     options.concat().as_ref(),
     payload.concat().as_ref()].concat()
  }

  #[test]
  fn parses_header_token_opts_payload() {
    let dgram = test_dgram();
    let pkt = Packet::parse(&dgram).unwrap();

    assert_eq!(pkt.ver(), Version(1));
    assert_eq!(pkt.ty(), Type::Con);
    assert_eq!(pkt.id(), Id(1));
    assert_eq!(pkt.code(), code::CONTENT);
    assert_eq!(pkt.token().as_bytes(), &[254]);
    assert_eq!(pkt.opt(CONTENT_FORMAT), Some(b"application/json".as_ref()));
    assert_eq!(pkt.payload(), b"hello, world!");
  }

  #[test]
  fn no_payload_marker_means_empty_payload() {
    // 2.05 Ack, empty token, no options
    let dgram = [0b01_10_0000u8, 0x45, 0x00, 0x07];
    let pkt = Packet::parse(&dgram).unwrap();
    assert_eq!(pkt.ty(), Type::Ack);
    assert_eq!(pkt.payload(), b"");
    assert_eq!(pkt.opts().count(), 0);
  }

  #[test]
  fn truncated_datagrams_are_rejected() {
    assert_eq!(Packet::parse(&[0x40, 0x01]),
               Err(ParseError::UnexpectedEndOfStream));

    // tkl = 4 but only 2 token bytes present
    assert_eq!(Packet::parse(&[0b01_00_0100, 0x01, 0x00, 0x01, 0xAA, 0xBB]),
               Err(ParseError::UnexpectedEndOfStream));

    // marker with nothing after it
    assert_eq!(Packet::parse(&[0x40, 0x01, 0x00, 0x01, 0xFF]),
               Err(ParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn reserved_nibbles_are_rejected() {
    // delta nibble 15 in a byte that is not the payload marker
    assert_eq!(Packet::parse(&[0x40, 0x01, 0x00, 0x01, 0xF0]),
               Err(ParseError::OptionDeltaReservedValue(15)));
    assert_eq!(Packet::parse(&[0x40, 0x01, 0x00, 0x01, 0x0F]),
               Err(ParseError::ValueLengthReservedValue(15)));
  }

  #[test]
  fn uint_option() {
    // Block2 option (delta 23 -> nibble 13, ext 10), value 0x012C
    let dgram = [0x40, 0x45, 0x00, 0x01, 0b1101_0010, 10, 0x01, 0x2C];
    let pkt = Packet::parse(&dgram).unwrap();
    assert_eq!(pkt.opt_u32(crate::opt::BLOCK2), Some(0x012C));
    assert_eq!(pkt.opt_u32(crate::opt::BLOCK1), None);
  }
}
