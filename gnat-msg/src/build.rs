use crate::code::Code;
use crate::opt;
use crate::opt::PAYLOAD_MARKER;
use crate::ty::{Id, Token, Type};

/// Errors encounterable while writing a message into a caller buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildError {
  /// The buffer has no room for what was about to be written.
  ///
  /// Nothing past the previous write survives in the buffer;
  /// nothing was written out of bounds.
  InsufficientSpace,

  /// Options must be written in non-decreasing option-number order;
  /// the wire format carries deltas, so a lower number after a higher
  /// one is unrepresentable.
  OptOutOfOrder {
    /// The last option number written
    prev: u16,
    /// The (smaller) number that was rejected
    next: u16,
  },
}

/// Write a message header (fixed 4 bytes + token) at the start of `buf`,
/// returning the number of bytes written.
///
/// This is the first step of building any message; follow it with an
/// [`OptWriter`] positioned at the returned length.
pub fn build_hdr(buf: &mut [u8],
                 ty: Type,
                 token: &Token,
                 code: Code,
                 id: Id)
                 -> Result<usize, BuildError> {
  let tkl = token.as_bytes().len();
  let len = 4 + tkl;
  if buf.len() < len {
    return Err(BuildError::InsufficientSpace);
  }

  buf[0] = (1 << 6) | (ty.into_u8() << 4) | tkl as u8;
  buf[1] = code.into_u8();
  buf[2..4].copy_from_slice(&id.0.to_be_bytes());
  buf[4..len].copy_from_slice(token.as_bytes());
  Ok(len)
}

/// A stateful cursor for appending options (and finally a payload) to a
/// message under construction.
///
/// The writer owns the remaining decisions of the wire format: it tracks
/// the previous option number to compute deltas, and it refuses
/// out-of-order writes instead of silently corrupting the message
/// ([`BuildError::OptOutOfOrder`]). Equal numbers are fine; CoAP allows
/// an option to repeat (Uri-Path does, for one).
///
/// ```
/// use gnat_msg::ty::{Id, Token, Type};
/// use gnat_msg::{build_hdr, code, opt, OptWriter};
///
/// let mut buf = [0u8; 64];
/// let hdr = build_hdr(&mut buf, Type::Con, &Token::opaque(&[1]), code::GET, Id(7)).unwrap();
///
/// let mut opts = OptWriter::new(&mut buf, hdr);
/// opts.push(opt::URI_PATH, b"sensors").unwrap();
/// opts.push(opt::URI_PATH, b"temp").unwrap();
/// let len = opts.finish();
/// ```
#[derive(Debug)]
pub struct OptWriter<'b> {
  buf: &'b mut [u8],
  pos: usize,
  last: u16,
}

impl<'b> OptWriter<'b> {
  /// Begin appending options at `pos` (the length returned by
  /// [`build_hdr`]).
  pub fn new(buf: &'b mut [u8], pos: usize) -> Self {
    Self { buf, pos, last: 0 }
  }

  /// Append one option, returning the bytes written.
  pub fn push(&mut self, number: u16, value: &[u8]) -> Result<usize, BuildError> {
    if number < self.last {
      return Err(BuildError::OptOutOfOrder { prev: self.last,
                                             next: number });
    }

    let delta = number - self.last;
    let len = value.len();
    if len > u16::MAX as usize {
      return Err(BuildError::InsufficientSpace);
    }

    let need = 1 + opt::ext_len(delta) + opt::ext_len(len as u16) + len;
    if self.pos + need > self.buf.len() {
      return Err(BuildError::InsufficientSpace);
    }

    self.buf[self.pos] = (opt::nibble(delta) << 4) | opt::nibble(len as u16);
    let mut pos = opt::write_ext(self.buf, self.pos + 1, delta);
    pos = opt::write_ext(self.buf, pos, len as u16);
    self.buf[pos..pos + len].copy_from_slice(value);

    self.pos = pos + len;
    self.last = number;
    Ok(need)
  }

  /// Append an option whose value is a big-endian unsigned integer in
  /// its shortest encoding (RFC7252 option value format "uint").
  ///
  /// Zero encodes as a zero-length value.
  pub fn push_uint(&mut self, number: u16, value: u32) -> Result<usize, BuildError> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    self.push(number, &bytes[skip..])
  }

  /// Finish the message with a payload, returning its total length.
  ///
  /// Writes the `0xFF` payload marker followed by `payload`; an empty
  /// payload writes nothing (a bare marker is a format error on the
  /// wire) and is equivalent to [`OptWriter::finish`].
  pub fn payload(self, payload: &[u8]) -> Result<usize, BuildError> {
    if payload.is_empty() {
      return Ok(self.pos);
    }

    if self.pos + 1 + payload.len() > self.buf.len() {
      return Err(BuildError::InsufficientSpace);
    }

    self.buf[self.pos] = PAYLOAD_MARKER;
    self.buf[self.pos + 1..self.pos + 1 + payload.len()].copy_from_slice(payload);
    Ok(self.pos + 1 + payload.len())
  }

  /// Finish the message without a payload, returning its total length.
  pub fn finish(self) -> usize {
    self.pos
  }

  /// The current write position
  pub fn pos(&self) -> usize {
    self.pos
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::code;
  use crate::parse::Packet;

  #[test]
  fn built_messages_parse_back() {
    let mut buf = [0u8; 128];
    let hdr = build_hdr(&mut buf,
                        Type::Con,
                        &Token::opaque(&[0xDE, 0xAD]),
                        code::PUT,
                        Id(0x1234)).unwrap();
    assert_eq!(hdr, 6);

    let mut opts = OptWriter::new(&mut buf, hdr);
    opts.push(crate::opt::URI_PATH, b"fw").unwrap();
    opts.push(crate::opt::URI_PATH, b"slot0").unwrap();
    opts.push_uint(crate::opt::BLOCK1, 0x09).unwrap();
    let len = opts.payload(b"\x01\x02\x03").unwrap();

    let pkt = Packet::parse(&buf[..len]).unwrap();
    assert_eq!(pkt.ty(), Type::Con);
    assert_eq!(pkt.code(), code::PUT);
    assert_eq!(pkt.id(), Id(0x1234));
    assert_eq!(pkt.token().as_bytes(), &[0xDE, 0xAD]);
    assert_eq!(pkt.opts()
                  .filter(|(n, _)| *n == crate::opt::URI_PATH)
                  .map(|(_, v)| v)
                  .collect::<Vec<_>>(),
               vec![b"fw".as_ref(), b"slot0".as_ref()]);
    assert_eq!(pkt.opt_u32(crate::opt::BLOCK1), Some(0x09));
    assert_eq!(pkt.payload(), &[1, 2, 3]);
  }

  #[test]
  fn out_of_order_options_are_rejected() {
    let mut buf = [0u8; 64];
    let hdr = build_hdr(&mut buf, Type::Con, &Token::default(), code::GET, Id(1)).unwrap();

    let mut opts = OptWriter::new(&mut buf, hdr);
    opts.push(crate::opt::BLOCK2, &[0x01]).unwrap();
    assert_eq!(opts.push(crate::opt::URI_PATH, b"nope"),
               Err(BuildError::OptOutOfOrder { prev: crate::opt::BLOCK2,
                                               next: crate::opt::URI_PATH }));

    // same number again is allowed
    assert!(opts.push(crate::opt::BLOCK2, &[0x02]).is_ok());
  }

  #[test]
  fn overrun_is_an_error_not_a_write() {
    let mut buf = [0u8; 8];
    let hdr = build_hdr(&mut buf, Type::Con, &Token::default(), code::GET, Id(1)).unwrap();

    let mut opts = OptWriter::new(&mut buf, hdr);
    assert_eq!(opts.push(crate::opt::URI_PATH, b"way-too-long-for-8-bytes"),
               Err(BuildError::InsufficientSpace));
    // position unchanged; the message is still valid without the option
    assert_eq!(opts.finish(), hdr);

    let mut tiny = [0u8; 2];
    assert_eq!(build_hdr(&mut tiny, Type::Con, &Token::default(), code::GET, Id(1)),
               Err(BuildError::InsufficientSpace));
  }

  #[test]
  fn uint_shortest_encoding() {
    let mut buf = [0u8; 64];
    let mut opts = OptWriter::new(&mut buf, 0);
    opts.push_uint(1, 0).unwrap();
    opts.push_uint(2, 0x0A).unwrap();
    opts.push_uint(3, 0x0102).unwrap();
    let len = opts.finish();

    // (delta 1, len 0) (delta 1, len 1) 0x0A (delta 1, len 2) 0x01 0x02
    assert_eq!(&buf[..len], &[0x10, 0x11, 0x0A, 0x12, 0x01, 0x02]);
  }
}
