use std::io;
use std::net::UdpSocket;

use embedded_time::rate::Fraction;
use no_std_net::{SocketAddr, ToSocketAddrs};

use crate::net::{Addrd, Socket};

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let now = std::time::Instant::now();
    let elapsed = now.duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let addrs = convert_socket_addrs(addr).ok_or_else(|| {
                                            io::Error::new(io::ErrorKind::InvalidInput,
                                                           "invalid socket addrs")
                                          })?;
    let sock = UdpSocket::bind(&*addrs)?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    let addr = convert_socket_addr(msg.addr());
    UdpSocket::send_to(self, msg.data(), addr).map(|_| ())
                                              .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    UdpSocket::recv_from(self, buffer).map(|(n, addr)| Addrd(n, convert_std_addr(addr)))
                                      .map_err(io_to_nb)
  }
}

fn io_to_nb(e: io::Error) -> nb::Error<io::Error> {
  match e.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(e),
  }
}

fn convert_socket_addr(addr: SocketAddr) -> std::net::SocketAddr {
  match addr {
    | SocketAddr::V4(sock) => {
      let ip = sock.ip().octets();
      let ip = std::net::Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]);
      std::net::SocketAddr::V4(std::net::SocketAddrV4::new(ip, sock.port()))
    },
    | SocketAddr::V6(sock) => {
      let ip = sock.ip().segments();
      let ip = std::net::Ipv6Addr::new(ip[0], ip[1], ip[2], ip[3], ip[4], ip[5], ip[6], ip[7]);
      std::net::SocketAddr::V6(std::net::SocketAddrV6::new(ip,
                                                           sock.port(),
                                                           sock.flowinfo(),
                                                           sock.scope_id()))
    },
  }
}

fn convert_std_addr(addr: std::net::SocketAddr) -> SocketAddr {
  match addr {
    | std::net::SocketAddr::V4(sock) => {
      let ip = sock.ip().octets();
      let ip = no_std_net::Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]);
      SocketAddr::V4(no_std_net::SocketAddrV4::new(ip, sock.port()))
    },
    | std::net::SocketAddr::V6(sock) => {
      let ip = sock.ip().segments();
      let ip = no_std_net::Ipv6Addr::new(ip[0], ip[1], ip[2], ip[3], ip[4], ip[5], ip[6], ip[7]);
      SocketAddr::V6(no_std_net::SocketAddrV6::new(ip, sock.port(), sock.flowinfo(), sock.scope_id()))
    },
  }
}

fn convert_socket_addrs<A: ToSocketAddrs>(a: A) -> Option<Vec<std::net::SocketAddr>> {
  a.to_socket_addrs()
   .ok()
   .map(|iter| iter.map(convert_socket_addr).collect())
}
