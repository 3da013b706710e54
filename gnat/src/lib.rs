//! `gnat` is a small synchronous CoAP client & server runtime.
//!
//! It talks [RFC 7252](https://datatracker.ietf.org/doc/html/rfc7252)
//! over UDP with a fully blocking control flow: every request suspends
//! the calling thread until the matching response arrives or the
//! retransmission budget runs out. There is no event loop, executor or
//! background thread; the only suspension points are the receive calls
//! inside the transaction engine.
//!
//! ## Sessions
//! A [`CoapSock`] is one socket talking to one remote endpoint,
//! supporting one transaction at a time (enforced by `&mut self`
//! receivers). On top of it sit:
//! - a simple request surface ([`CoapSock::get`], [`CoapSock::put`],
//!   [`CoapSock::post`] and their non-confirmable siblings)
//! - block-wise transfer per
//!   [RFC 7959](https://datatracker.ietf.org/doc/html/rfc7959):
//!   [`block1::BlockRequest`] for uploads, [`block2::fetch`] and
//!   friends for downloads
//! - a blocking server loop ([`server::serve`]) dispatching over a
//!   sorted resource table
//!
//! Message encoding and decoding live in the sibling `gnat-msg` crate,
//! which is `no_std` and allocation-free; this crate adds the sockets,
//! clocks and timers.
//!
//! ```no_run
//! use gnat::CoapSock;
//!
//! fn main() -> gnat::Result<()> {
//!   let (mut sock, path) = CoapSock::connect_url("coap://127.0.0.1:5683/riot/value")?;
//!   let mut buf = [0u8; 256];
//!   let n = sock.get(path, &mut buf)?;
//!   println!("{}", String::from_utf8_lossy(&buf[..n]));
//!   Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/gnat/0.1.0")]
#![cfg_attr(not(test),
            deny(missing_debug_implementations,
                 unreachable_pub,
                 unsafe_code,
                 missing_copy_implementations))]
#![deny(missing_docs)]
// - prefer explicit effectful statements that end in a () expr
// - prefer `fn foo() -> ()` to `fn foo()`
#![allow(clippy::unused_unit)]

/// Block1 uploads
pub mod block1;

/// Block2 downloads
pub mod block2;

/// Sessions and the transaction engine
pub mod client;

/// Runtime configuration
pub mod config;

/// The error type
pub mod error;

/// Sockets
pub mod net;

/// Request building
pub mod req;

/// Retryable operations
pub mod retry;

/// The blocking server loop
pub mod server;

/// Implementations of gnat traits for `std` types
pub mod std;

/// URL handling
pub mod url;


#[doc(inline)]
pub use client::CoapSock;
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use req::Method;
