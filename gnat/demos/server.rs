use std::net::UdpSocket;

use gnat::block2::block2_reply;
use gnat::net::Socket;
use gnat::server::{methods, serve, Resource};
use gnat_msg::code;

pub const ADDR: &str = "127.0.0.1:5683";

fn big_resource() -> Vec<u8> {
  (0..800u32).map(|i| (i % 251) as u8).collect()
}

pub fn run() {
  let addr = no_std_net::SocketAddr::new(no_std_net::IpAddr::V4(no_std_net::Ipv4Addr::new(127, 0, 0, 1)),
                                         5683);
  let sock = <UdpSocket as Socket>::bind(addr).unwrap();
  log::info!("server listening on {}", ADDR);

  let big = big_resource();
  let resources =
    [Resource { path: "/big",
                methods: methods::GET,
                handler: &|req, rep| block2_reply(req, rep, code::CONTENT, 2, &big) },
     Resource { path: "/hello",
                methods: methods::GET,
                handler: &|_, rep| rep.simple(code::CONTENT, b"hello from gnat") },
     Resource { path: "/value",
                methods: methods::PUT | methods::POST,
                handler: &|req, rep| {
                  log::info!("value <- {} bytes", req.payload().len());
                  rep.simple(code::CHANGED, &[])
                } }];

  serve(&sock, &resources).unwrap();
}

pub fn spawn() {
  std::thread::spawn(run);
  // give the listener a beat to bind
  std::thread::sleep(std::time::Duration::from_millis(100));
}

#[allow(dead_code)]
fn main() {
  simple_logger::init_with_level(log::Level::Debug).unwrap();
  run();
}
