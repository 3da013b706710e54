use core::ops::ControlFlow;

use embedded_time::Clock;
use gnat_msg::{opt, Block, Code, CodeKind, Packet, Slicer, Type};

use crate::client::CoapSock;
use crate::error::{Error, Result};
use crate::net::Socket;
use crate::req::{write_request, Method};
use crate::server::Reply;

/// Fetch a resource block by block (RFC 7959 Block2), handing each
/// block to `visit` as it arrives.
///
/// `visit(offset, bytes, more)` is called once per received block with
/// the block's byte offset into the whole representation; returning
/// `ControlFlow::Break` stops the transfer early.
///
/// `szx` is the requested size exponent (0 ..= 6). The server may
/// answer block 0 with a smaller size; the transfer adopts it for the
/// remaining blocks. An echoed block number different from the
/// requested one fails with [`Error::BlockMismatch`] and is fatal to
/// the transfer. A response with no Block2 option at all means the
/// whole representation fit in one exchange; `visit` then sees a single
/// block at offset 0 with `more == false`.
pub fn fetch<S, C>(sock: &mut CoapSock<S, C>,
                   path: &str,
                   szx: u8,
                   mut visit: impl FnMut(usize, &[u8], bool) -> ControlFlow<()>)
                   -> Result<()>
  where S: Socket,
        C: Clock<T = u64>
{
  let mut szx = szx.min(6);
  let mut num = 0u32;

  loop {
    let (token, id) = sock.new_pair();
    let mut buf = [0u8; 1152];
    let len = write_request(&mut buf,
                            Type::Con,
                            &token,
                            Method::Get.code(),
                            id,
                            path,
                            None,
                            Some(Block::new(num, szx, false)),
                            &[])?;

    let step = sock.request_with(&buf[..len], |rep| {
                      let code = rep.code();
                      if !(code.kind() == CodeKind::Response && code.class == 2) {
                        return Err(Error::Server(code));
                      }

                      match rep.block2() {
                        | None => Ok((visit(0, rep.payload(), false), None)),
                        | Some(b) => {
                          if b.num() != num || (num > 0 && b.szx() != szx) {
                            return Err(Error::BlockMismatch { expected: num,
                                                              actual: b.num() });
                          }

                          // block 0 is where the server gets to shrink
                          // the block size; afterwards it is fixed
                          let adopted = if num == 0 { szx.min(b.szx()) } else { szx };
                          let offset = num as usize * (1usize << (adopted + 4));
                          Ok((visit(offset, rep.payload(), b.more()), Some((adopted, b.more()))))
                        },
                      }
                    })??;

    match step {
      | (ControlFlow::Break(()), _) => return Ok(()),
      | (_, None) => return Ok(()),
      | (_, Some((_, false))) => return Ok(()),
      | (ControlFlow::Continue(()), Some((adopted, true))) => {
        szx = adopted;
        num += 1;
      },
    }
  }
}

/// Like [`fetch`], but reassembles the representation into `buf`.
///
/// Every append is bounds-checked first; a representation larger than
/// `buf` fails with [`Error::BufferTooSmall`] without writing a single
/// byte past the end. Returns the total number of bytes written.
pub fn fetch_to_buf<S, C>(sock: &mut CoapSock<S, C>,
                          path: &str,
                          szx: u8,
                          buf: &mut [u8])
                          -> Result<usize>
  where S: Socket,
        C: Clock<T = u64>
{
  let mut len = 0usize;
  let mut overflow = false;

  fetch(sock, path, szx, |off, bytes, _| {
    if off + bytes.len() > buf.len() {
      overflow = true;
      return ControlFlow::Break(());
    }
    buf[off..off + bytes.len()].copy_from_slice(bytes);
    len = len.max(off + bytes.len());
    ControlFlow::Continue(())
  })?;

  if overflow {
    Err(Error::BufferTooSmall)
  } else {
    Ok(len)
  }
}

/// One-shot [`fetch`] against an absolute `coap://` URL
pub fn fetch_url(url: &str,
                 szx: u8,
                 visit: impl FnMut(usize, &[u8], bool) -> ControlFlow<()>)
                 -> Result<()> {
  let (mut sock, path) = CoapSock::connect_url(url)?;
  let res = fetch(&mut sock, path, szx, visit);
  sock.close();
  res
}

/// One-shot [`fetch_to_buf`] against an absolute `coap://` URL
pub fn fetch_url_to_buf(url: &str, szx: u8, buf: &mut [u8]) -> Result<usize> {
  let (mut sock, path) = CoapSock::connect_url(url)?;
  let res = fetch_to_buf(&mut sock, path, szx, buf);
  sock.close();
  res
}

/// Server-side mirror of [`fetch`]: answer one Block2 round out of the
/// full representation `data`.
///
/// The requested size exponent is clamped to `max_szx`, rescaling the
/// block number accordingly, and a request with no Block2 option is
/// served as block 0 at `max_szx`. Writes the Block2 option and the
/// payload slice for the requested block; returns the total reply
/// length.
pub fn block2_reply(req: &Packet,
                    reply: Reply<'_>,
                    code: Code,
                    max_szx: u8,
                    data: &[u8])
                    -> Result<usize> {
  let max_szx = max_szx.min(6);
  let requested = req.block2().unwrap_or_else(|| Block::new(0, max_szx, false));
  let slicer = Slicer::from_block(requested, data.len(), max_szx);

  let mut w = reply.options(code)?;
  w.push_uint(opt::BLOCK2, slicer.block().value())?;
  w.payload(&data[slicer.range()]).map_err(Error::from)
}
