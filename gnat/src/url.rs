use core::str::FromStr;

use no_std_net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::Error;

/// The UDP port CoAP servers listen on unless told otherwise
pub const DEFAULT_PORT: u16 = 5683;

/// Split an absolute `coap://` URL into the remote endpoint and the
/// resource path.
///
/// The host must be an IPv4 or IPv6 literal (IPv6 in brackets); name
/// resolution is deliberately not this crate's business. The returned
/// path keeps its leading slash and may be empty.
///
/// ```
/// use gnat::url::split_url;
///
/// let (addr, path) = split_url("coap://[::1]:5688/riot/value").unwrap();
/// assert_eq!(addr.port(), 5688);
/// assert_eq!(path, "/riot/value");
/// ```
pub fn split_url(url: &str) -> Result<(SocketAddr, &str), Error> {
  let rest = url.strip_prefix("coap://").ok_or(Error::InvalidUrl)?;

  let (authority, path) = match rest.find('/') {
    | Some(ix) => rest.split_at(ix),
    | None => (rest, ""),
  };

  let (host, port) = split_authority(authority)?;
  Ok((SocketAddr::new(host, port), path))
}

fn split_authority(authority: &str) -> Result<(IpAddr, u16), Error> {
  if authority.is_empty() {
    return Err(Error::InvalidUrl);
  }

  if let Some(v6) = authority.strip_prefix('[') {
    let end = v6.find(']').ok_or(Error::InvalidUrl)?;
    let host = Ipv6Addr::from_str(&v6[..end]).map_err(|_| Error::InvalidUrl)?;
    let port = match &v6[end + 1..] {
      | "" => DEFAULT_PORT,
      | p => parse_port(p.strip_prefix(':').ok_or(Error::InvalidUrl)?)?,
    };
    return Ok((IpAddr::V6(host), port));
  }

  let (host, port) = match authority.rsplit_once(':') {
    | Some((host, port)) => (host, parse_port(port)?),
    | None => (authority, DEFAULT_PORT),
  };

  Ipv4Addr::from_str(host).map(|ip| (IpAddr::V4(ip), port))
                          .map_err(|_| Error::InvalidUrl)
}

fn parse_port(p: &str) -> Result<u16, Error> {
  u16::from_str(p).map_err(|_| Error::InvalidUrl)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn v4() {
    let (addr, path) = split_url("coap://192.168.1.1/fw/slot0").unwrap();
    assert_eq!(addr, SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 5683));
    assert_eq!(path, "/fw/slot0");

    let (addr, path) = split_url("coap://10.0.0.1:61616").unwrap();
    assert_eq!(addr.port(), 61616);
    assert_eq!(path, "");
  }

  #[test]
  fn v6() {
    let (addr, _) = split_url("coap://[2001:db8::1]/x").unwrap();
    assert_eq!(addr.port(), DEFAULT_PORT);

    let (addr, _) = split_url("coap://[::1]:9999/x").unwrap();
    assert_eq!(addr.port(), 9999);
  }

  #[test]
  fn malformed() {
    for bad in ["http://1.2.3.4/x",
                "coap://",
                "coap:///x",
                "coap://hostname/x",
                "coap://[::1/x",
                "coap://[::1]x/y",
                "coap://1.2.3.4:notaport/x"] {
      assert_eq!(split_url(bad).map(|(_, p)| p), Err(Error::InvalidUrl), "{}", bad);
    }
  }
}
