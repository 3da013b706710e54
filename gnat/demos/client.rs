use core::ops::ControlFlow;

use gnat::block1::BlockRequest;
use gnat::block2;
use gnat::{CoapSock, Method};

#[path = "./server.rs"]
mod server;

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();
  server::spawn();

  let url = format!("coap://{}/hello", server::ADDR);
  let (mut sock, path) = CoapSock::connect_url(&url).unwrap();

  let mut buf = [0u8; 256];
  let n = sock.get(path, &mut buf).unwrap();
  println!("GET /hello -> {}", String::from_utf8_lossy(&buf[..n]));

  sock.put("/value", b"42", None).unwrap();
  println!("PUT /value ok");

  // block-wise download, 1024-byte blocks requested (the server caps
  // at 64, so the client adopts that)
  let mut total = 0usize;
  block2::fetch(&mut sock, "/big", 6, |off, bytes, more| {
    total = off + bytes.len();
    println!("block at {:>4}: {} bytes, more: {}", off, bytes.len(), more);
    ControlFlow::Continue(())
  }).unwrap();
  println!("fetched {} bytes block-wise", total);

  // block-wise upload in 32-byte blocks
  let payload = vec![7u8; 100];
  let mut up = BlockRequest::new(&mut sock, "/value", Method::Put, 1);
  while !up.done(&payload) {
    let sent = up.send_block(&payload, false).unwrap();
    println!("uploaded block {} ({} bytes)", up.num() - 1, sent);
  }

  sock.close();
}
