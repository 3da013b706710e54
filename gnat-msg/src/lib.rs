//! `gnat-msg` is low-level CoAP message parsing & serialization
//! for environments where the message buffer is owned by the caller.
//!
//! Unlike heap-based CoAP implementations, nothing in this crate owns
//! message bytes: [`Packet`] is a read-only view over a received datagram,
//! and the [`build`] module writes an outgoing message directly into a
//! caller-provided `&mut [u8]`.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the semantics of HTTP
//! to an environment conducive to **constrained** devices. (weak hardware, small battery capacity, etc.)
//!
//! See [RFC7252](https://datatracker.ietf.org/doc/html/rfc7252) for the
//! message format, and [RFC7959](https://datatracker.ietf.org/doc/html/rfc7959)
//! for the block-wise transfer options implemented by [`block`].

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test),
            deny(missing_debug_implementations,
                 unreachable_pub,
                 unsafe_code,
                 missing_copy_implementations))]
#![deny(missing_docs)]
// - prefer explicit effectful statements that end in a () expr
// - prefer `fn foo() -> ()` to `fn foo()`
#![allow(clippy::unused_unit)]

/// Block-wise transfer (RFC7959) option values & payload slicing
pub mod block;
/// Message writing over a caller buffer
pub mod build;
/// Request & response codes
pub mod code;
/// Option numbers & delta encoding
pub mod opt;
/// Zero-copy message reading
pub mod parse;
/// Primitive message fields
pub mod ty;

#[doc(inline)]
pub use block::{Block, Slicer};
#[doc(inline)]
pub use build::{build_hdr, BuildError, OptWriter};
#[doc(inline)]
pub use code::{Code, CodeKind};
#[doc(inline)]
pub use parse::{Packet, ParseError};
#[doc(inline)]
pub use ty::{Id, Token, Type, Version};
