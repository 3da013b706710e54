use gnat_msg::build::{build_hdr, BuildError, OptWriter};
use gnat_msg::{code, opt, Block, Code, Id, Token, Type};

/// Request methods
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Method {
  #[allow(missing_docs)]
  Get,
  #[allow(missing_docs)]
  Post,
  #[allow(missing_docs)]
  Put,
  #[allow(missing_docs)]
  Delete,
}

impl Method {
  /// The request [`Code`] for this method
  pub fn code(self) -> Code {
    match self {
      | Self::Get => code::GET,
      | Self::Post => code::POST,
      | Self::Put => code::PUT,
      | Self::Delete => code::DELETE,
    }
  }

  /// Bit in a [`crate::server::Resource`] method mask
  pub fn mask(self) -> u8 {
    match self {
      | Self::Get => crate::server::methods::GET,
      | Self::Post => crate::server::methods::POST,
      | Self::Put => crate::server::methods::PUT,
      | Self::Delete => crate::server::methods::DELETE,
    }
  }

  pub(crate) fn try_from_code(c: Code) -> Option<Self> {
    match c {
      | code::GET => Some(Self::Get),
      | code::POST => Some(Self::Post),
      | code::PUT => Some(Self::Put),
      | code::DELETE => Some(Self::Delete),
      | _ => None,
    }
  }
}

/// Write a complete request message into `buf`, returning its length.
///
/// `path` is split on `/` into one Uri-Path option per segment; empty
/// segments (leading slash, doubled slashes) are skipped.
pub(crate) fn write_request(buf: &mut [u8],
                            ty: Type,
                            token: &Token,
                            code: Code,
                            id: Id,
                            path: &str,
                            block1: Option<Block>,
                            block2: Option<Block>,
                            payload: &[u8])
                            -> Result<usize, BuildError> {
  let hdr = build_hdr(buf, ty, token, code, id)?;
  let mut opts = OptWriter::new(buf, hdr);

  for seg in path.split('/').filter(|s| !s.is_empty()) {
    opts.push(opt::URI_PATH, seg.as_bytes())?;
  }
  if let Some(b) = block2 {
    opts.push_uint(opt::BLOCK2, b.value())?;
  }
  if let Some(b) = block1 {
    opts.push_uint(opt::BLOCK1, b.value())?;
  }

  opts.payload(payload)
}

#[cfg(test)]
mod test {
  use gnat_msg::Packet;

  use super::*;

  #[test]
  fn path_segments_become_uri_path_options() {
    let mut buf = [0u8; 128];
    let len = write_request(&mut buf,
                            Type::Con,
                            &Token::opaque(&[1]),
                            code::GET,
                            Id(9),
                            "/riot//value/",
                            None,
                            None,
                            &[]).unwrap();

    let pkt = Packet::parse(&buf[..len]).unwrap();
    let segs = pkt.opts()
                  .filter(|(n, _)| *n == opt::URI_PATH)
                  .map(|(_, v)| v)
                  .collect::<Vec<_>>();
    assert_eq!(segs, vec![b"riot".as_ref(), b"value".as_ref()]);
  }

  #[test]
  fn block_options_are_carried() {
    let mut buf = [0u8; 128];
    let len = write_request(&mut buf,
                            Type::Con,
                            &Token::default(),
                            code::PUT,
                            Id(9),
                            "fw",
                            Some(Block::new(3, 2, true)),
                            None,
                            b"chunk").unwrap();

    let pkt = Packet::parse(&buf[..len]).unwrap();
    let b1 = pkt.block1().unwrap();
    assert_eq!((b1.num(), b1.size(), b1.more()), (3, 64, true));
    assert_eq!(pkt.payload(), b"chunk");
  }
}
