use embedded_time::duration::Milliseconds;
use embedded_time::Clock;
use gnat_msg::{build_hdr, code, CodeKind, Id, Packet, Token, Type};
use no_std_net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{Addrd, Dgram, Socket};
use crate::req::{write_request, Method};
use crate::retry::{Attempts, RetryTimer, YouShould};
use crate::url::split_url;

/// A CoAP session: one socket conversing with one remote endpoint.
///
/// All request methods take `&mut self`, which is what enforces the
/// "exactly one outstanding transaction per session" rule; a second
/// request cannot begin until the first one returned.
///
/// Every exchange runs through the same engine ([`CoapSock::request`]):
/// send, block on receive with a bounded timeout, discard datagrams that
/// do not match the outstanding token, retransmit confirmables on the
/// backoff schedule in [`Config`], and fail with [`Error::TimedOut`]
/// once the budget is spent.
#[allow(missing_debug_implementations)]
pub struct CoapSock<S: Socket, C: Clock<T = u64>> {
  sock: S,
  remote: SocketAddr,
  clock: C,
  cfg: Config,
  rng: ChaCha8Rng,
  next_id: u16,
}

impl<S: Socket, C: Clock<T = u64>> CoapSock<S, C> {
  /// Create a session over an already-bound socket.
  pub fn new(sock: S, clock: C, cfg: Config, remote: SocketAddr) -> Result<Self> {
    let seed = clock.try_now()
                    .ok()
                    .and_then(|now| Milliseconds::<u64>::try_from(now.duration_since_epoch()).ok())
                    .map(|Milliseconds(ms)| ms)
                    .unwrap_or(0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let next_id = rng.gen();

    Ok(Self { sock,
              remote,
              clock,
              cfg,
              rng,
              next_id })
  }

  /// The remote endpoint this session converses with
  pub fn remote(&self) -> SocketAddr {
    self.remote
  }

  /// Close the session, releasing the socket.
  pub fn close(self) {}

  /// A fresh (token, message id) pair for one transaction
  pub(crate) fn new_pair(&mut self) -> (Token, Id) {
    let mut bytes = [0u8; 8];
    self.rng.fill(&mut bytes);
    self.next_id = self.next_id.wrapping_add(1);
    (Token::opaque(&bytes), Id(self.next_id))
  }

  /// Send a fully-built request living in `buf[..len]` and block until
  /// the matching response arrives, reusing `buf` for it.
  ///
  /// On success the response occupies the front of `buf` and the
  /// returned [`Packet`] is a view over it; the request bytes are gone.
  /// Retransmission is unaffected by that reuse: the engine receives
  /// into a scratch datagram and only overwrites `buf` once a response
  /// matched the token.
  pub fn request<'b>(&mut self, buf: &'b mut [u8], len: usize) -> Result<Packet<'b>> {
    let (token, id, confirmable) = {
      let req = Packet::parse(&buf[..len])?;
      (req.token(), req.id(), req.ty() == Type::Con)
    };

    let dgram = self.exchange(&buf[..len], token, id, confirmable)?;
    if dgram.len() > buf.len() {
      return Err(Error::BufferTooSmall);
    }

    buf[..dgram.len()].copy_from_slice(&dgram);
    Packet::parse(&buf[..dgram.len()]).map_err(Error::from)
  }

  /// Like [`CoapSock::request`], but hands the response to a callback
  /// as a zero-copy view instead of writing it back into a caller
  /// buffer.
  pub fn request_with<R>(&mut self, req: &[u8], f: impl FnOnce(&Packet) -> R) -> Result<R> {
    let (token, id, confirmable) = {
      let parsed = Packet::parse(req)?;
      (parsed.token(), parsed.id(), parsed.ty() == Type::Con)
    };

    let dgram = self.exchange(req, token, id, confirmable)?;
    let rep = Packet::parse(&dgram)?;
    Ok(f(&rep))
  }

  /// Simple confirmable GET; the response payload lands at the front of
  /// `resp`.
  pub fn get(&mut self, path: &str, resp: &mut [u8]) -> Result<usize> {
    self.simple(Type::Con, Method::Get, path, &[], Some(resp))
  }

  /// Simple non-confirmable GET
  pub fn get_non(&mut self, path: &str, resp: &mut [u8]) -> Result<usize> {
    self.simple(Type::Non, Method::Get, path, &[], Some(resp))
  }

  /// Simple confirmable PUT.
  ///
  /// `resp` may be `None` when the caller does not care about the
  /// response payload; the exchange still waits for the ack.
  pub fn put(&mut self, path: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    self.simple(Type::Con, Method::Put, path, payload, resp)
  }

  /// Simple non-confirmable PUT.
  ///
  /// With no `resp` buffer the request is sent exactly once and `Ok(0)`
  /// is returned without waiting, independently of remote-side success.
  pub fn put_non(&mut self, path: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    self.simple(Type::Non, Method::Put, path, payload, resp)
  }

  /// Simple confirmable POST
  pub fn post(&mut self, path: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    self.simple(Type::Con, Method::Post, path, payload, resp)
  }

  /// Simple non-confirmable POST; see [`CoapSock::put_non`]
  pub fn post_non(&mut self, path: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    self.simple(Type::Non, Method::Post, path, payload, resp)
  }

  fn simple(&mut self,
            ty: Type,
            method: Method,
            path: &str,
            payload: &[u8],
            mut resp: Option<&mut [u8]>)
            -> Result<usize> {
    let (token, id) = self.new_pair();

    let mut local = [0u8; 1152];
    let wants_response = resp.is_some();
    let buf: &mut [u8] = match resp.as_mut() {
      | Some(b) => b,
      | None => &mut local,
    };

    let len = write_request(buf, ty, &token, method.code(), id, path, None, None, payload)?;

    if !wants_response && ty == Type::Non {
      // no response requested; fling it and move on
      self.send_raw(&buf[..len])?;
      return Ok(0);
    }

    let dgram = self.exchange(&buf[..len], token, id, ty == Type::Con)?;
    if !wants_response {
      return Ok(0);
    }

    if dgram.len() > buf.len() {
      return Err(Error::BufferTooSmall);
    }
    buf[..dgram.len()].copy_from_slice(&dgram);

    let range = Packet::parse(&buf[..dgram.len()])?.payload_range();
    let n = range.len();
    buf.copy_within(range, 0);
    Ok(n)
  }

  /// The transaction loop shared by every request flavor.
  ///
  /// Returns the raw datagram of the first response matching `token`
  /// from the session's remote.
  fn exchange(&mut self, req: &[u8], token: Token, id: Id, confirmable: bool) -> Result<Dgram> {
    self.send_raw(req)?;

    let (strategy, attempts) = if confirmable {
      (self.cfg.con_strategy(), self.cfg.con_attempts())
    } else {
      (self.cfg.non_strategy(), Attempts(2))
    };
    let mut retry = RetryTimer::new(self.clock.try_now()?, strategy, attempts);

    // set once the server signals "ack'd, response comes separately";
    // retransmitting after that would only make it respond twice
    let mut acked = false;

    loop {
      let mut scratch = [0u8; 1152];
      match self.sock.recv(&mut scratch) {
        | Ok(Addrd(n, addr)) => {
          if addr != self.remote {
            log::debug!("gnat: ignoring datagram from unexpected peer {:?}", addr);
            continue;
          }

          match Packet::parse(&scratch[..n]) {
            | Ok(rep) if rep.ty() == Type::Reset && rep.id() == id => {
              log::debug!("gnat: {:?} reset by peer", id);
              return Err(Error::Reset);
            },
            | Ok(rep) if rep.code().kind() == CodeKind::Empty && rep.ty() == Type::Ack
                         && rep.id() == id =>
            {
              log::trace!("gnat: {:?} ack'd, awaiting separate response", id);
              acked = true;
            },
            | Ok(rep) if rep.code().kind() == CodeKind::Response && rep.token() == token => {
              if rep.ty() == Type::Con {
                self.ack(rep.id())?;
              }
              return Ok(scratch.into_iter().take(n).collect());
            },
            | Ok(_) => {
              log::debug!("gnat: response token mismatch, discarding");
            },
            | Err(e) => {
              log::debug!("gnat: discarding undecodable datagram ({:?})", e);
            },
          }
        },
        | Err(nb::Error::WouldBlock) => {
          match retry.what_should_i_do(self.clock.try_now()?) {
            | Ok(YouShould::Retry) if confirmable && !acked => {
              log::trace!("gnat: {:?} retransmitting", id);
              self.send_raw(req)?;
            },
            | Ok(YouShould::Retry) => (),
            | Ok(YouShould::Cry) => {
              log::debug!("gnat: {:?} timed out", id);
              return Err(Error::TimedOut);
            },
            | Err(nb::Error::WouldBlock) => (),
            | Err(nb::Error::Other(never)) => match never {},
          }
        },
        | Err(nb::Error::Other(e)) => {
          log::error!("gnat: recv failed: {:?}", e);
          return Err(Error::Network);
        },
      }
    }
  }

  /// Acknowledge a separate confirmable response
  fn ack(&mut self, id: Id) -> Result<()> {
    let mut buf = [0u8; 4];
    let len = build_hdr(&mut buf, Type::Ack, &Token::default(), code::EMPTY, id)?;
    self.send_raw(&buf[..len])
  }

  fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
    nb::block!(self.sock.send(Addrd(bytes, self.remote))).map_err(|e| {
                                                           log::error!("gnat: send failed: {:?}", e);
                                                           Error::Network
                                                         })
  }
}

impl CoapSock<std::net::UdpSocket, crate::std::Clock> {
  /// Create a session to `remote` over an ephemeral local UDP port.
  pub fn connect(remote: SocketAddr) -> Result<Self> {
    let local = match remote {
      | SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 0),
      | SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0)), 0),
    };
    let sock = <std::net::UdpSocket as Socket>::bind(local).map_err(|e| {
                                                             log::error!("gnat: bind failed: {:?}", e);
                                                             Error::Network
                                                           })?;
    Self::new(sock, crate::std::Clock::new(), Config::default(), remote)
  }

  /// Create a session from an absolute `coap://` URL, yielding the
  /// session and the URL's resource path.
  pub fn connect_url(url: &str) -> Result<(Self, &str)> {
    let (addr, path) = split_url(url)?;
    Ok((Self::connect(addr)?, path))
  }

  /// One-shot confirmable PUT to an absolute URL
  pub fn put_url(url: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    let (mut sock, path) = Self::connect_url(url)?;
    let res = sock.put(path, payload, resp);
    sock.close();
    res
  }

  /// One-shot confirmable POST to an absolute URL
  pub fn post_url(url: &str, payload: &[u8], resp: Option<&mut [u8]>) -> Result<usize> {
    let (mut sock, path) = Self::connect_url(url)?;
    let res = sock.post(path, payload, resp);
    sock.close();
    res
  }
}

#[cfg(test)]
mod tests {
  use gnat_msg::code;

  use super::*;
  use crate::test::{reply_to, ClockMock, SockMock};

  fn quick_cfg() -> Config {
    Config { ack_timeout: Milliseconds(8),
             ack_timeout_max: Milliseconds(8),
             max_retransmit: 3,
             non_timeout: Milliseconds(8) }
  }

  fn sess(sock: SockMock) -> CoapSock<SockMock, ClockMock> {
    CoapSock::new(sock, ClockMock::stepping(1), quick_cfg(), SockMock::server_addr()).unwrap()
  }

  #[test]
  fn get_returns_payload_at_front() {
    let sock = SockMock::new();
    sock.respond(|req| vec![reply_to(&req, code::CONTENT, &[], b"hi there")]);

    let mut sess = sess(sock);
    let mut buf = [0u8; 256];
    let n = sess.get("/hello", &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hi there");
  }

  #[test]
  fn foreign_token_is_discarded_and_we_time_out() {
    let sock = SockMock::new();
    let sends = sock.sent_count();
    sock.respond(|req| {
          let mut r = reply_to(&req, code::CONTENT, &[], b"not yours");
          // corrupt the token so it can never match
          let tkl = (r[0] & 0xF) as usize;
          for b in &mut r[4..4 + tkl] {
            *b = !*b;
          }
          vec![r]
        });

    let mut sess = sess(sock);
    let mut buf = [0u8; 256];
    assert_eq!(sess.get("/hello", &mut buf), Err(Error::TimedOut));
    // initial send + MAX_RETRANSMIT retransmissions
    assert_eq!(sends.get(), 4);
  }

  #[test]
  fn unanswered_confirmable_retransmits_then_times_out() {
    let sock = SockMock::new();
    let sends = sock.sent_count();

    let mut sess = sess(sock);
    let mut buf = [0u8; 256];
    assert_eq!(sess.get("/black_hole", &mut buf), Err(Error::TimedOut));
    assert_eq!(sends.get(), 4);
  }

  #[test]
  fn separate_response_after_empty_ack() {
    let sock = SockMock::new();
    sock.respond(|req| {
          // empty ack, then a confirmable response with a fresh id
          let mut ack = [0u8; 4];
          let len = build_hdr(&mut ack, Type::Ack, &Token::default(), code::EMPTY, req.id()).unwrap();
          let sep = {
            let mut buf = [0u8; 128];
            let hdr =
              build_hdr(&mut buf, Type::Con, &req.token(), code::CONTENT, Id(0xBEEF)).unwrap();
            let n = gnat_msg::OptWriter::new(&mut buf, hdr).payload(b"slow answer").unwrap();
            buf[..n].to_vec()
          };
          vec![ack[..len].to_vec(), sep]
        });

    let mut sess = sess(sock);
    let mut buf = [0u8; 256];
    let n = sess.get("/slow", &mut buf).unwrap();
    assert_eq!(&buf[..n], b"slow answer");
  }

  #[test]
  fn peer_reset_fails_the_transaction() {
    let sock = SockMock::new();
    sock.respond(|req| {
          let mut rst = [0u8; 4];
          let len =
            build_hdr(&mut rst, Type::Reset, &Token::default(), code::EMPTY, req.id()).unwrap();
          vec![rst[..len].to_vec()]
        });

    let mut sess = sess(sock);
    let mut buf = [0u8; 256];
    assert_eq!(sess.get("/x", &mut buf), Err(Error::Reset));
  }

  #[test]
  fn non_without_response_buffer_returns_immediately() {
    let sock = SockMock::new();
    let sends = sock.sent_count();

    let mut sess = sess(sock);
    assert_eq!(sess.put_non("/x", b"data", None), Ok(0));
    assert_eq!(sends.get(), 1);
  }
}
