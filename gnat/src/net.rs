use no_std_net::{SocketAddr, ToSocketAddrs};
use tinyvec::ArrayVec;

/// Data that came from (or is going to) a network socket
#[derive(Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addrd
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the address and get the data in this Addrd
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addrd
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A datagram pulled off a UDP socket.
///
/// Currently the capacity is hard-coded at 1152 bytes,
/// but this will eventually be configurable at compile-time.
pub type Dgram = ArrayVec<[u8; 1152]>;

/// A CoAP network socket
///
/// This mirrors the Udp socket traits in embedded-nal, but allows us to
/// implement them for foreign types (like `std::net::UdpSocket`).
///
/// All operations are non-blocking ([`nb::Result`]); blocking behavior
/// is layered on top by the transaction engine, which is what lets the
/// engine interleave receiving with its retransmission timer.
pub trait Socket: Sized {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug;

  /// Bind the socket to a local address, yielding it in a
  /// non-blocking state.
  ///
  /// Implementations should bind to the first address if `addr` yields
  /// multiple.
  fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error>;

  /// Send a message to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the address
  /// of the sender.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;
}
