//! Option numbers and the shared delta/length nibble encoding.
//!
//! Options on the wire do not carry their number directly; each one
//! carries the difference to the previous option's number. Both the
//! delta and the value length use the same encoding: values 0-12
//! inline in the nibble, 13 meaning "1 extension byte + 13", 14 meaning
//! "2 extension bytes + 269", and 15 reserved (except that a whole byte
//! of `0xFF` is the payload marker, not an option header).
//!
//! # Related
//! - [RFC7252#section-3.1 Option Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3.1)

/// Uri-Host
pub const URI_HOST: u16 = 3;
/// Uri-Port
pub const URI_PORT: u16 = 7;
/// Uri-Path; one option per path segment
pub const URI_PATH: u16 = 11;
/// Content-Format
pub const CONTENT_FORMAT: u16 = 12;
/// Block2; descriptive block option for the response payload (RFC7959)
pub const BLOCK2: u16 = 23;
/// Block1; descriptive block option for the request payload (RFC7959)
pub const BLOCK1: u16 = 27;
/// Size2; total size of the resource representation, in bytes (RFC7959)
pub const SIZE2: u16 = 28;

/// The payload marker byte separating options from payload
pub(crate) const PAYLOAD_MARKER: u8 = 0xFF;

/// Number of bytes the extended form of `n` occupies past the nibble
pub(crate) fn ext_len(n: u16) -> usize {
  match n {
    | 0..=12 => 0,
    | 13..=268 => 1,
    | _ => 2,
  }
}

/// The nibble for `n` (the extension bytes are written separately)
pub(crate) fn nibble(n: u16) -> u8 {
  match n {
    | 0..=12 => n as u8,
    | 13..=268 => 13,
    | _ => 14,
  }
}

/// Write the extension bytes for `n` at `buf[pos..]`, returning the
/// new position.
///
/// The caller has already checked capacity.
pub(crate) fn write_ext(buf: &mut [u8], pos: usize, n: u16) -> usize {
  match n {
    | 0..=12 => pos,
    | 13..=268 => {
      buf[pos] = (n - 13) as u8;
      pos + 1
    },
    | _ => {
      buf[pos..pos + 2].copy_from_slice(&(n - 269).to_be_bytes());
      pos + 2
    },
  }
}
