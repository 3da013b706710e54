use gnat_msg::{build_hdr, code, opt, Code, CodeKind, Id, OptWriter, Packet, Token, Type};

use crate::error::{Error, Result};
use crate::net::{Addrd, Socket};
use crate::req::Method;

/// Bits for [`Resource::methods`] masks
pub mod methods {
  /// Allow GET
  pub const GET: u8 = 1 << 0;
  /// Allow POST
  pub const POST: u8 = 1 << 1;
  /// Allow PUT
  pub const PUT: u8 = 1 << 2;
  /// Allow DELETE
  pub const DELETE: u8 = 1 << 3;
  /// Allow everything
  pub const ALL: u8 = GET | POST | PUT | DELETE;
}

/// One entry in a server's dispatch table.
///
/// Tables handed to [`serve`] / [`handle_request`] must be sorted by
/// `path`; lookup is a binary search.
#[allow(missing_debug_implementations)]
#[derive(Clone, Copy)]
pub struct Resource<'r> {
  /// Absolute path this resource lives at, e.g. `"/riot/value"`
  pub path: &'r str,
  /// Bitmask of allowed methods, see [`methods`]
  pub methods: u8,
  /// Invoked with the parsed request and a writer for the response.
  ///
  /// The request view and the response writer borrow disjoint buffers,
  /// so the handler is free to read the request while building the
  /// response; it returns the response length from one of the `Reply`
  /// finishers.
  pub handler: &'r dyn Fn(&Packet, Reply) -> Result<usize>,
}

/// Writer for a response to one particular request.
///
/// Already knows the message type (piggybacked Ack for a confirmable
/// request, Non otherwise), token and message id; the handler only
/// chooses the code, options and payload.
#[allow(missing_debug_implementations)]
pub struct Reply<'b> {
  buf: &'b mut [u8],
  ty: Type,
  token: Token,
  id: Id,
}

impl<'b> Reply<'b> {
  /// A reply mirroring `req`, to be written into `buf`
  pub fn to(req: &Packet, buf: &'b mut [u8]) -> Self {
    Self { buf,
           ty: match req.ty() {
             | Type::Con => Type::Ack,
             | _ => Type::Non,
           },
           token: req.token(),
           id: req.id() }
  }

  /// Finish with a code and a plain payload
  pub fn simple(self, code: Code, payload: &[u8]) -> Result<usize> {
    self.options(code)?.payload(payload).map_err(Error::from)
  }

  /// Write the header and hand back an [`OptWriter`] for responses
  /// that carry options
  pub fn options(self, code: Code) -> Result<OptWriter<'b>> {
    let Self { buf, ty, token, id } = self;
    let hdr = build_hdr(&mut *buf, ty, &token, code, id)?;
    Ok(OptWriter::new(buf, hdr))
  }
}

/// Dispatch one datagram against a sorted resource table, writing any
/// response into `out`.
///
/// Returns the response length, 0 meaning "nothing to send back"
/// (malformed datagrams, empty Non messages, stray responses).
/// Unknown paths get 4.04, known paths with a disallowed method 4.05,
/// confirmable pings a Reset.
pub fn handle_request(resources: &[Resource], dgram: &[u8], out: &mut [u8]) -> Result<usize> {
  let req = match Packet::parse(dgram) {
    | Ok(req) => req,
    | Err(e) => {
      log::debug!("gnat: dropping undecodable datagram ({:?})", e);
      return Ok(0);
    },
  };

  if req.code().kind() == CodeKind::Empty {
    // CoAP ping
    return if req.ty() == Type::Con {
      build_hdr(out, Type::Reset, &Token::default(), code::EMPTY, req.id()).map_err(Error::from)
    } else {
      Ok(0)
    };
  }

  if req.code().kind() != CodeKind::Request {
    return Ok(0);
  }

  let reply = Reply::to(&req, out);

  let mut path_buf = [0u8; MAX_PATH];
  let path = match uri_path(&req, &mut path_buf) {
    | Some(path) => path,
    | None => return reply.simple(code::BAD_REQUEST, &[]),
  };

  match resources.binary_search_by(|r| r.path.cmp(path)) {
    | Err(_) => reply.simple(code::NOT_FOUND, &[]),
    | Ok(ix) => {
      let resource = &resources[ix];
      match Method::try_from_code(req.code()) {
        | Some(m) if resource.methods & m.mask() != 0 => (resource.handler)(&req, reply),
        | _ => reply.simple(code::METHOD_NOT_ALLOWED, &[]),
      }
    },
  }
}

/// Serve `resources` forever, one request at a time.
///
/// Returns only when the socket fails. Handler errors are logged and
/// the offending request goes unanswered; the loop keeps going.
pub fn serve<S: Socket>(sock: &S, resources: &[Resource]) -> Result<()> {
  loop {
    let mut scratch = [0u8; 1152];
    let Addrd(n, addr) = nb::block!(sock.recv(&mut scratch)).map_err(|e| {
                                                              log::error!("gnat: server recv failed: {:?}", e);
                                                              Error::Network
                                                            })?;

    let mut out = [0u8; 1152];
    match handle_request(resources, &scratch[..n], &mut out) {
      | Ok(0) => (),
      | Ok(len) => {
        nb::block!(sock.send(Addrd(&out[..len], addr))).map_err(|e| {
                                                          log::error!("gnat: server send failed: {:?}", e);
                                                          Error::Network
                                                        })?;
      },
      | Err(e) => log::error!("gnat: handler failed: {:?}", e),
    }
  }
}

const MAX_PATH: usize = 64;

/// Reassemble the request's Uri-Path options into `buf` as an absolute
/// path. `None` when the path is too long or not utf8.
fn uri_path<'p>(req: &Packet, buf: &'p mut [u8]) -> Option<&'p str> {
  let mut len = 0usize;

  for (_, seg) in req.opts().filter(|(n, _)| *n == opt::URI_PATH) {
    if len + 1 + seg.len() > buf.len() {
      return None;
    }
    buf[len] = b'/';
    buf[len + 1..len + 1 + seg.len()].copy_from_slice(seg);
    len += 1 + seg.len();
  }

  if len == 0 {
    buf[0] = b'/';
    len = 1;
  }

  core::str::from_utf8(&buf[..len]).ok()
}

#[cfg(test)]
mod tests {
  use gnat_msg::Block;

  use super::*;
  use crate::block2::block2_reply;
  use crate::req::write_request;

  fn get(path: &str, block2: Option<Block>) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let len = write_request(&mut buf,
                            Type::Con,
                            &Token::opaque(&[0xAA, 0xBB]),
                            code::GET,
                            Id(77),
                            path,
                            None,
                            block2,
                            &[]).unwrap();
    buf[..len].to_vec()
  }

  fn table() -> [Resource<'static>; 2] {
    [Resource { path: "/time",
                methods: methods::GET,
                handler: &|_, rep| rep.simple(code::CONTENT, b"12:00") },
     Resource { path: "/value",
                methods: methods::GET | methods::PUT,
                handler: &|_, rep| rep.simple(code::CHANGED, &[]) }]
  }

  #[test]
  fn known_path_is_dispatched() {
    let mut out = [0u8; 256];
    let n = handle_request(&table(), &get("/time", None), &mut out).unwrap();

    let rep = Packet::parse(&out[..n]).unwrap();
    assert_eq!(rep.code(), code::CONTENT);
    assert_eq!(rep.ty(), Type::Ack);
    assert_eq!(rep.id(), Id(77));
    assert_eq!(rep.token(), Token::opaque(&[0xAA, 0xBB]));
    assert_eq!(rep.payload(), b"12:00");
  }

  #[test]
  fn unknown_path_is_not_found() {
    let mut out = [0u8; 256];
    let n = handle_request(&table(), &get("/nope", None), &mut out).unwrap();
    assert_eq!(Packet::parse(&out[..n]).unwrap().code(), code::NOT_FOUND);
  }

  #[test]
  fn disallowed_method_is_rejected() {
    let mut buf = [0u8; 256];
    let len = write_request(&mut buf,
                            Type::Con,
                            &Token::default(),
                            code::DELETE,
                            Id(1),
                            "/time",
                            None,
                            None,
                            &[]).unwrap();

    let mut out = [0u8; 256];
    let n = handle_request(&table(), &buf[..len], &mut out).unwrap();
    assert_eq!(Packet::parse(&out[..n]).unwrap().code(),
               code::METHOD_NOT_ALLOWED);
  }

  #[test]
  fn confirmable_ping_gets_reset() {
    let mut ping = [0u8; 4];
    let len = build_hdr(&mut ping, Type::Con, &Token::default(), code::EMPTY, Id(3)).unwrap();

    let mut out = [0u8; 16];
    let n = handle_request(&table(), &ping[..len], &mut out).unwrap();

    let rep = Packet::parse(&out[..n]).unwrap();
    assert_eq!(rep.ty(), Type::Reset);
    assert_eq!(rep.id(), Id(3));
  }

  #[test]
  fn garbage_is_silently_dropped() {
    let mut out = [0u8; 16];
    assert_eq!(handle_request(&table(), &[0xFF, 0x01], &mut out), Ok(0));
  }

  #[test]
  fn non_request_gets_non_reply() {
    let mut buf = [0u8; 256];
    let len = write_request(&mut buf,
                            Type::Non,
                            &Token::opaque(&[1]),
                            code::GET,
                            Id(5),
                            "/time",
                            None,
                            None,
                            &[]).unwrap();

    let mut out = [0u8; 256];
    let n = handle_request(&table(), &buf[..len], &mut out).unwrap();
    assert_eq!(Packet::parse(&out[..n]).unwrap().ty(), Type::Non);
  }

  #[test]
  fn block2_reply_serves_the_requested_slice() {
    let data = (0..80).map(|i| i as u8).collect::<Vec<_>>();
    let resources = [Resource { path: "/big",
                                methods: methods::GET,
                                handler: &|req, rep| {
                                  block2_reply(req, rep, code::CONTENT, 1, &data)
                                } }];

    let mut out = [0u8; 256];
    let n = handle_request(&resources,
                           &get("/big", Some(Block::new(1, 1, false))),
                           &mut out).unwrap();

    let rep = Packet::parse(&out[..n]).unwrap();
    let b = rep.block2().unwrap();
    assert_eq!((b.num(), b.size(), b.more()), (1, 32, true));
    assert_eq!(rep.payload(), &data[32..64]);
  }

  #[test]
  fn block2_reply_clamps_oversized_requests() {
    let resources = [Resource { path: "/big",
                                methods: methods::GET,
                                handler: &|req, rep| {
                                  block2_reply(req, rep, code::CONTENT, 1, &[9u8; 80])
                                } }];

    // ask for 1024-byte blocks against a 32-byte server maximum
    let mut out = [0u8; 256];
    let n = handle_request(&resources,
                           &get("/big", Some(Block::new(0, 6, false))),
                           &mut out).unwrap();

    let rep = Packet::parse(&out[..n]).unwrap();
    let b = rep.block2().unwrap();
    assert_eq!((b.num(), b.size(), b.more()), (0, 32, true));
    assert_eq!(rep.payload().len(), 32);
  }
}
