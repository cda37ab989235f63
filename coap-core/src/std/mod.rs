//! `std`-only platform glue: a [`Clock`] backed by [`std::time::Instant`]
//! and a [`Socket`](crate::net::Socket) impl for [`std::net::UdpSocket`].

use std::io;
use std::net::UdpSocket;

use embedded_time::rate::Fraction;
use tinyvec::ArrayVec;

use crate::net::{Addrd, Socket};

fn to_std(addr: no_std_net::SocketAddr) -> std::net::SocketAddr {
  match addr {
    | no_std_net::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      std::net::SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::new(a, b, c, d),
                                                           v4.port()))
    },
    | no_std_net::SocketAddr::V6(v6) => {
      let segs = v6.ip().segments();
      std::net::SocketAddr::V6(std::net::SocketAddrV6::new(std::net::Ipv6Addr::new(segs[0],
                                                                                   segs[1],
                                                                                   segs[2],
                                                                                   segs[3],
                                                                                   segs[4],
                                                                                   segs[5],
                                                                                   segs[6],
                                                                                   segs[7]),
                                                           v6.port(),
                                                           v6.flowinfo(),
                                                           v6.scope_id()))
    },
  }
}

fn to_no_std(addr: std::net::SocketAddr) -> no_std_net::SocketAddr {
  match addr {
    | std::net::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(no_std_net::Ipv4Addr::new(a,
                                                                                         b,
                                                                                         c,
                                                                                         d),
                                                               v4.port()))
    },
    | std::net::SocketAddr::V6(v6) => {
      let segs = v6.ip().segments();
      no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(no_std_net::Ipv6Addr::new(segs[0],
                                                                                         segs[1],
                                                                                         segs[2],
                                                                                         segs[3],
                                                                                         segs[4],
                                                                                         segs[5],
                                                                                         segs[6],
                                                                                         segs[7]),
                                                               v6.port(),
                                                               v6.flowinfo(),
                                                               v6.scope_id()))
    },
  }
}

fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;
  type Dgram = ArrayVec<[u8; 1152]>;

  fn local_addr(&self) -> no_std_net::SocketAddr {
    to_no_std(UdpSocket::local_addr(self).unwrap())
  }

  fn empty_dgram() -> Self::Dgram {
    ArrayVec::from([0u8; 1152])
  }

  fn bind_raw<A: no_std_net::ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let addrs = addr.to_socket_addrs()
                    .unwrap()
                    .map(to_std)
                    .collect::<std::vec::Vec<_>>();

    let sock = UdpSocket::bind(addrs.as_slice())?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.set_nonblocking(true).map_err(io_to_nb)?;
    UdpSocket::send_to(self, msg.data(), to_std(msg.addr())).map_err(io_to_nb)?;
    Ok(())
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.set_nonblocking(true).map_err(io_to_nb)?;
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, to_no_std(addr)))
        .map_err(io_to_nb)
  }

  fn peek(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    UdpSocket::peek_from(self, buffer).map(|(n, addr)| Addrd(n, to_no_std(addr)))
                                      .map_err(io_to_nb)
  }

  fn join_multicast(&self, addr: no_std_net::IpAddr) -> Result<(), Self::Error> {
    match addr {
      | no_std_net::IpAddr::V4(v4) => {
        let [a, b, c, d] = v4.octets();
        self.join_multicast_v4(&std::net::Ipv4Addr::new(a, b, c, d),
                               &std::net::Ipv4Addr::UNSPECIFIED)
      },
      | no_std_net::IpAddr::V6(v6) => self.join_multicast_v6(&{
                                                               let s = v6.segments();
                                                               std::net::Ipv6Addr::new(s[0],
                                                                                      s[1],
                                                                                      s[2],
                                                                                      s[3],
                                                                                      s[4],
                                                                                      s[5],
                                                                                      s[6],
                                                                                      s[7])
                                                             },
                                                             0),
    }
  }
}

/// [`embedded_time::Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock, anchored to the time of this call.
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let elapsed = std::time::Instant::now().duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::Clock as _;

  use super::*;

  #[test]
  fn clock_advances() {
    let clock = Clock::new();
    let t0 = clock.try_now().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let t1 = clock.try_now().unwrap();
    assert!(t1 > t0);
  }

  #[test]
  fn udp_socket_loopback() {
    let a = UdpSocket::bind_raw(no_std_net::SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    let b = UdpSocket::bind_raw(no_std_net::SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    let a_addr = a.local_addr();

    b.send(Addrd(b"hello", a_addr)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    let mut buf = [0u8; 16];
    let Addrd(n, _) = nb::block!(a.recv(&mut buf)).unwrap();
    assert_eq!(&buf[..n], b"hello");
  }
}
