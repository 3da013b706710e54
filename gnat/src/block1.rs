use embedded_time::Clock;
use gnat_msg::{Block, CodeKind, Packet, Slicer, Type};

use crate::client::CoapSock;
use crate::error::{Error, Result};
use crate::net::Socket;
use crate::req::Method;

/// Driver for uploading a representation block by block (RFC 7959
/// Block1).
///
/// Each [`BlockRequest::send_block`] call ships one block and waits for
/// the server's verdict. The block counter only advances when the
/// server answered 2.xx, so a failed call (timeout, reset, error
/// response) can simply be retried with the same arguments and the
/// transfer resumes where it left off, without resending blocks the
/// server already accepted.
#[allow(missing_debug_implementations)]
pub struct BlockRequest<'a, 'p, S: Socket, C: Clock<T = u64>> {
  sock: &'a mut CoapSock<S, C>,
  path: &'p str,
  method: Method,
  num: u32,
  szx: u8,
}

impl<'a, 'p, S: Socket, C: Clock<T = u64>> BlockRequest<'a, 'p, S, C> {
  /// Start a Block1 upload to `path` over an existing session.
  ///
  /// `szx` is the RFC 7959 size exponent (0 ..= 6, i.e. block sizes
  /// 16 ..= 1024); out-of-range values are clamped.
  pub fn new(sock: &'a mut CoapSock<S, C>, path: &'p str, method: Method, szx: u8) -> Self {
    Self { sock,
           path,
           method,
           num: 0,
           szx: szx.min(6) }
  }

  /// The number of the next block to be sent
  pub fn num(&self) -> u32 {
    self.num
  }

  /// The block size used for this transfer
  pub fn block_size(&self) -> usize {
    1 << (self.szx + 4)
  }

  /// Whether the whole of `data` has been accepted by the server
  pub fn done(&self, data: &[u8]) -> bool {
    self.num as usize * self.block_size() >= data.len()
  }

  /// Send the current block, sliced out of the full representation
  /// `data`.
  ///
  /// The More flag is set when blocks remain after this one, or
  /// unconditionally when the caller announces a continuation via
  /// `more_hint` (for streaming uploads whose total length is not yet
  /// known). Returns the number of payload bytes the server accepted.
  ///
  /// A non-2.xx response fails with [`Error::Server`] and leaves the
  /// transfer state untouched, so the same call can be retried.
  pub fn send_block(&mut self, data: &[u8], more_hint: bool) -> Result<usize> {
    self.send_block_with(data, more_hint, |_| ()).map(|(n, ())| n)
  }

  /// Like [`BlockRequest::send_block`], but also hands the server's
  /// response to `f`. Useful for the final block, whose response may
  /// carry a payload or options worth inspecting.
  pub fn send_block_with<R>(&mut self,
                            data: &[u8],
                            more_hint: bool,
                            f: impl FnOnce(&Packet) -> R)
                            -> Result<(usize, R)> {
    let slicer = Slicer::new(self.num, self.szx, data.len());
    let more = more_hint || slicer.more();
    let block = Block::new(self.num, self.szx, more);
    let chunk = &data[slicer.range()];

    let (token, id) = self.sock.new_pair();
    let mut buf = [0u8; 1152];
    let len = crate::req::write_request(&mut buf,
                                        Type::Con,
                                        &token,
                                        self.method.code(),
                                        id,
                                        self.path,
                                        Some(block),
                                        None,
                                        chunk)?;

    let (code, out) = self.sock.request_with(&buf[..len], |rep| (rep.code(), f(rep)))?;

    if code.kind() == CodeKind::Response && code.class == 2 {
      self.num += 1;
      Ok((chunk.len(), out))
    } else {
      Err(Error::Server(code))
    }
  }
}

#[cfg(test)]
mod tests {
  use gnat_msg::code;

  use super::*;
  use crate::client::CoapSock;
  use crate::config::Config;
  use crate::test::{reply_to, ClockMock, SockMock};

  fn sess(sock: SockMock) -> CoapSock<SockMock, ClockMock> {
    CoapSock::new(sock,
                  ClockMock::stepping(1),
                  Config::default(),
                  SockMock::server_addr()).unwrap()
  }

  fn continue_responder(sock: &SockMock) {
    sock.respond(|req| {
          let b = req.block1().unwrap();
          let code = if b.more() { code::CONTINUE } else { code::CHANGED };
          vec![reply_to(&req, code, &[(gnat_msg::opt::BLOCK1, b.value())], &[])]
        });
  }

  #[test]
  fn hundred_bytes_at_64_takes_two_rounds() {
    let sock = SockMock::new();
    let log = sock.sent_log();
    continue_responder(&sock);

    let mut sess = sess(sock);
    let mut up = BlockRequest::new(&mut sess, "/fw", Method::Put, 2);
    assert_eq!(up.block_size(), 64);

    let data = [0xAB; 100];
    assert_eq!(up.send_block(&data, false), Ok(64));
    assert_eq!(up.send_block(&data, false), Ok(36));
    assert!(up.done(&data));
    assert_eq!(up.num(), 2);

    let flags = log.borrow()
                   .iter()
                   .map(|bytes| {
                     let b = Packet::parse(bytes).unwrap().block1().unwrap();
                     (b.num(), b.more())
                   })
                   .collect::<Vec<_>>();
    assert_eq!(flags, vec![(0, true), (1, false)]);
  }

  #[test]
  fn upload_reassembles_exactly() {
    let sock = SockMock::new();
    let log = sock.sent_log();
    continue_responder(&sock);

    let mut sess = sess(sock);
    let mut up = BlockRequest::new(&mut sess, "/fw", Method::Post, 1);

    let data = (0..100).map(|i| i as u8).collect::<Vec<_>>();
    while !up.done(&data) {
      up.send_block(&data, false).unwrap();
    }

    let rebuilt = log.borrow()
                     .iter()
                     .flat_map(|bytes| Packet::parse(bytes).unwrap().payload().to_vec())
                     .collect::<Vec<_>>();
    assert_eq!(rebuilt, data);
  }

  #[test]
  fn rejected_block_leaves_state_untouched() {
    let sock = SockMock::new();
    sock.respond(|req| vec![reply_to(&req, code::REQUEST_ENTITY_TOO_LARGE, &[], &[])]);

    let mut sess = sess(sock);
    let mut up = BlockRequest::new(&mut sess, "/fw", Method::Put, 2);

    let data = [1u8; 200];
    assert_eq!(up.send_block(&data, false),
               Err(Error::Server(code::REQUEST_ENTITY_TOO_LARGE)));
    assert_eq!(up.num(), 0);

    // a retry is indistinguishable from the first attempt
    assert_eq!(up.send_block(&data, false),
               Err(Error::Server(code::REQUEST_ENTITY_TOO_LARGE)));
    assert_eq!(up.num(), 0);
  }

  #[test]
  fn oversized_szx_is_clamped() {
    let sock = SockMock::new();
    let mut sess = sess(sock);
    let up = BlockRequest::new(&mut sess, "/x", Method::Put, 9);
    assert_eq!(up.block_size(), 1024);
  }
}
