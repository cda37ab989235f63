//! The concrete CoAP runtime: a resource table, an observer registry,
//! an outgoing retransmission queue, and a pending-reply table, driven
//! by one [`Socket`] and one [`Clock`].

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use embedded_time::{Clock, Instant};

use crate::config::Config;
use crate::net::{Addrd, Socket};
use crate::req::Req;
use crate::resp::Resp;

/// The path/handler table a [`Server`] dispatches requests against.
pub mod resource;

/// Server-side Observe bookkeeping.
pub mod observe;

/// Outbound Confirmable-message retransmission.
pub mod outgoing;

/// Client-side pending-reply bookkeeping.
pub mod pending;

/// Ingress routing and the reentrancy guard.
pub mod dispatch;

pub use dispatch::{Dispatcher, Outcome, ReentrancyGuard};
pub use observe::{Observer, ObserveRegistry};
pub use outgoing::OutgoingQueue;
pub use pending::PendingTable;
pub use resource::{HandlerFn, ResourceTable};

/// Errors a [`Server`] can surface while driving the socket.
///
/// A datagram that fails to decode is not one of these: it is logged
/// and silently dropped by [`Server::poll`], since one malformed
/// datagram from one peer should never be fatal to the server.
#[derive(Debug)]
pub enum Error<E> {
  /// The socket reported an I/O error.
  Socket(E),
}

/// Owns the socket and every piece of per-connection state needed to
/// act as both a CoAP server and a CoAP client: mounted resources,
/// observer subscriptions, the outgoing retransmission queue, and the
/// table of requests awaiting a reply.
pub struct Server<Sock: Socket, C: Clock<T = u64>> {
  socket: Sock,
  clock: C,
  config: Config,
  dispatcher: Dispatcher,
  outgoing: OutgoingQueue<C>,
  pending: PendingTable<C>,
  next_id: u16,
}

impl<Sock: Socket, C: Clock<T = u64>> core::fmt::Debug for Server<Sock, C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Server")
     .field("config", &self.config)
     .field("dispatcher", &self.dispatcher)
     .field("outgoing", &self.outgoing)
     .field("pending", &self.pending)
     .field("next_id", &self.next_id)
     .finish()
  }
}

impl<Sock: Socket, C: Clock<T = u64>> Server<Sock, C> {
  /// Wrap an already-bound socket and clock with a fresh, empty runtime.
  ///
  /// This crate has no secure (DTLS) transport, so every instance joins
  /// the IPv4 and IPv6 all-CoAP-nodes multicast groups on whatever
  /// multicast-capable link the socket's default interface sits on, per
  /// the unconditional non-secure-server join described in §3/§6.
  /// A link that doesn't support multicast (or a socket bound to one)
  /// logs a warning and is otherwise unaffected: unicast behavior never
  /// depends on the join having succeeded.
  pub fn new(socket: Sock, clock: C, config: Config) -> Self {
    for ip in [no_std_net::IpAddr::V4(crate::net::multicast::ALL_COAP_DEVICES_IPV4),
               no_std_net::IpAddr::V6(crate::net::multicast::ALL_COAP_DEVICES_IPV6_LINK_LOCAL),
               no_std_net::IpAddr::V6(crate::net::multicast::ALL_COAP_DEVICES_IPV6_SITE_LOCAL)]
    {
      if let Err(e) = socket.join_multicast(ip) {
        log::warn!("failed to join all-CoAP-nodes multicast group {:?}: {:?}", ip, e);
      }
    }

    Self { socket,
           clock,
           config,
           dispatcher: Dispatcher::new(),
           outgoing: OutgoingQueue::new(),
           pending: PendingTable::new(),
           next_id: 0 }
  }

  /// Mount a request handler at `path`.
  pub fn mount(&mut self, path: impl Into<std_alloc::string::String>, observable: bool, handler: HandlerFn) {
    self.dispatcher.resources.mount(path, observable, handler);
  }

  /// Install the unknown-resource fallback handler, called instead of
  /// the default `4.04 Not Found` for a request matching no mounted
  /// resource.
  pub fn set_fallback(&mut self, handler: HandlerFn) {
    self.dispatcher.set_fallback(handler);
  }

  fn now(&self) -> Instant<C> {
    self.clock.try_now().expect("clock must be infallible in this runtime")
  }

  fn fresh_id(&mut self) -> coap_msg::Id {
    let id = coap_msg::Id(self.next_id);
    self.next_id = self.next_id.wrapping_add(1);
    id
  }

  /// Send `req` to `addr`. Confirmable requests are registered with the
  /// outgoing retransmitter; every request is registered with the
  /// pending-reply table so a later [`Server::poll`] can correlate the
  /// response.
  ///
  /// A Non-confirmable request is registered as a kept entry: it may be
  /// answered more than once (an Observe subscription's notifications)
  /// or by more than one peer (a multicast discovery request), so a
  /// match against it does not consume it. Call
  /// [`Server::stop_expecting_replies`] once the caller is done with it
  /// (deregistering an Observe session, or closing a discovery window).
  pub fn send_request(&mut self, req: &Req, addr: no_std_net::SocketAddr) -> nb::Result<(), Sock::Error> {
    let packet = req.packet();
    packet.set_id(self.fresh_id());

    let bytes = packet.encode().expect("a request built via Req always encodes");
    let now = self.now();

    if req.msg_type() == coap_msg::Type::Non {
      self.pending.insert_keep(packet.id(), packet.token(), addr, now);
    } else {
      self.pending.insert(packet.id(), packet.token(), addr, now);
    }

    if req.msg_type() == coap_msg::Type::Con {
      self.outgoing.enqueue(packet.id(), addr, bytes.clone(), now, &self.config);
    }

    self.socket.send(Addrd(bytes.as_slice(), addr))
  }

  /// Stop matching inbound replies against the pending entry for
  /// `token`, if one is still open. Used to tear down a kept entry
  /// (an Observe session being deregistered, or a discovery window
  /// being closed) once the caller no longer wants its responses.
  pub fn stop_expecting_replies(&mut self, token: &coap_msg::Token) {
    self.pending.remove(token);
  }

  /// Process exactly one inbound datagram, if one is waiting. Returns
  /// `Ok(None)` if nothing was queued on the socket, or if the
  /// datagram did not decode as a well-formed packet — a malformed
  /// datagram is logged and dropped rather than torn down as an error,
  /// since one bad peer should never take the server down.
  pub fn poll(&mut self) -> Result<Option<Addrd<Resp>>, Error<Sock::Error>> {
    let mut buf = Sock::empty_dgram();
    let Addrd(n, addr) = match self.socket.recv(&mut buf) {
      | Ok(addrd) => addrd,
      | Err(nb::Error::WouldBlock) => return Ok(None),
      | Err(nb::Error::Other(e)) => return Err(Error::Socket(e)),
    };

    let packet = match coap_msg::Packet::decode(&buf.as_ref()[..n]) {
      | Ok(packet) => packet,
      | Err(e) => {
        log::warn!("dropping malformed datagram from {:?}: {:?}", addr, e);
        return Ok(None);
      },
    };

    if packet.code().kind() == coap_msg::CodeKind::Response {
      if let Some(pending) = self.pending.resolve(&packet.token(), addr) {
        self.outgoing.ack(pending.id, addr);
        return Ok(Some(Addrd(packet.into(), addr)));
      }
    }

    match self.dispatcher.dispatch(&packet, addr) {
      | Outcome::Respond(resp) | Outcome::Reset(resp) => {
        if let Ok(bytes) = resp.encode() {
          self.socket.send(Addrd(bytes.as_slice(), addr)).ok();
        }
        Ok(None)
      },
      | Outcome::AckOrReset => {
        self.outgoing.ack(packet.id(), addr);
        Ok(None)
      },
      | Outcome::Drop => Ok(None),
    }
  }

  /// Advance retransmission and pending-reply timers. Must be called
  /// periodically even when no datagrams are arriving, or Confirmable
  /// messages will never be retried or given up on.
  ///
  /// Returns every one-shot pending-reply entry whose global timeout
  /// fired this tick — a caller that sent them is expected to treat
  /// each as a terminal failure (a null/no-packet callback invocation
  /// in its own terms), per §4.4/§4.7's "no reply arrived" handling.
  /// Kept entries (Observe sessions, open discovery windows) are never
  /// expired here.
  pub fn tick(&mut self) -> nb::Result<Vec<pending::Pending<C>>, Sock::Error> {
    let now = self.now();

    let (resend, _gave_up) = self.outgoing.poll(now);
    for Addrd(bytes, addr) in resend {
      self.socket.send(Addrd(bytes.as_slice(), addr))?;
    }

    Ok(self.pending.expire(now, &self.config))
  }

  /// Push a fresh representation of `path` out to every registered
  /// observer.
  pub fn notify(&mut self, path: &str, payload: &[u8]) -> nb::Result<(), Sock::Error> {
    for Addrd(packet, addr) in self.dispatcher.notify(path, payload) {
      if let Ok(bytes) = packet.encode() {
        self.socket.send(Addrd(bytes.as_slice(), addr))?;
      }
    }
    Ok(())
  }

  /// Push a per-observer representation of `path` out to every
  /// registered observer, composed fresh for each one by `compose`.
  /// Returning [`crate::resp::code::UNAUTHORIZED`] from `compose` omits
  /// that observer from this round without erroring the whole call —
  /// e.g. a representation that differs by requester.
  pub fn notify_with(&mut self,
                      path: &str,
                      compose: impl FnMut(&crate::server::observe::Observer)
                                   -> (coap_msg::Code, std_alloc::vec::Vec<u8>))
                      -> nb::Result<(), Sock::Error> {
    for Addrd(packet, addr) in self.dispatcher.notify_with(path, compose) {
      if let Ok(bytes) = packet.encode() {
        self.socket.send(Addrd(bytes.as_slice(), addr))?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use core::cell::RefCell;

  use embedded_time::rate::Fraction;
  use no_std_net::SocketAddr;
  use std_alloc::rc::Rc;
  use std_alloc::vec::Vec;
  use tinyvec::ArrayVec;

  use super::*;

  struct FakeClock(Rc<RefCell<u64>>);

  impl Clock for FakeClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
      Ok(Instant::new(*self.0.borrow()))
    }
  }

  /// An in-memory, unidirectional [`Socket`]: datagrams queued onto
  /// `inbound` are yielded by `recv`, and everything sent is recorded
  /// in `outbound` instead of touching a real network.
  #[derive(Default)]
  struct FakeSocket {
    inbound: RefCell<std_alloc::collections::VecDeque<Addrd<Vec<u8>>>>,
    outbound: RefCell<Vec<Addrd<Vec<u8>>>>,
  }

  impl Socket for FakeSocket {
    type Error = core::convert::Infallible;
    type Dgram = ArrayVec<[u8; 1152]>;

    fn local_addr(&self) -> no_std_net::SocketAddr {
      SocketAddr::from(([127, 0, 0, 1], 5683))
    }

    fn empty_dgram() -> Self::Dgram {
      ArrayVec::from([0u8; 1152])
    }

    fn bind_raw<A: no_std_net::ToSocketAddrs>(_addr: A) -> Result<Self, Self::Error> {
      Ok(Self::default())
    }

    fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
      self.outbound.borrow_mut().push(Addrd(msg.data().to_vec(), msg.addr()));
      Ok(())
    }

    fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
      match self.inbound.borrow_mut().pop_front() {
        | Some(Addrd(bytes, addr)) => {
          let n = bytes.len();
          buffer[..n].copy_from_slice(&bytes);
          Ok(Addrd(n, addr))
        },
        | None => Err(nb::Error::WouldBlock),
      }
    }

    fn peek(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
      match self.inbound.borrow().front() {
        | Some(Addrd(bytes, addr)) => {
          let n = bytes.len();
          buffer[..n].copy_from_slice(&bytes[..n.min(buffer.len())]);
          Ok(Addrd(n, *addr))
        },
        | None => Err(nb::Error::WouldBlock),
      }
    }

    fn join_multicast(&self, _addr: no_std_net::IpAddr) -> Result<(), Self::Error> {
      Ok(())
    }
  }

  fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([192, 168, 0, 1], port))
  }

  fn respond(socket: &FakeSocket, from: SocketAddr, resp: &Resp) {
    let bytes = resp.packet().encode().unwrap();
    socket.inbound.borrow_mut().push_back(Addrd(bytes, from));
  }

  #[test]
  fn con_reply_is_matched_once_and_removed() {
    let clock = FakeClock(Rc::new(RefCell::new(0)));
    let socket = FakeSocket::default();
    let mut server = Server::new(socket, clock, Config::default());

    let req = Req::get("a");
    server.send_request(&req, peer(5683)).unwrap();
    assert_eq!(server.pending.len(), 1);

    let mut resp = Resp::for_request(&req).unwrap();
    resp.set_code(crate::resp::code::CONTENT);
    respond(&server.socket, peer(5683), &resp);

    assert!(server.poll().unwrap().is_some());
    assert!(server.pending.is_empty());

    // The same reply again (duplicate datagram) no longer matches anything.
    respond(&server.socket, peer(5683), &resp);
    assert!(server.poll().unwrap().is_none());
  }

  #[test]
  fn observe_session_receives_more_than_one_notification() {
    let clock = FakeClock(Rc::new(RefCell::new(0)));
    let socket = FakeSocket::default();
    let mut server = Server::new(socket, clock, Config::default());

    let mut req = Req::get("s/light");
    req.non();
    req.packet().set_token(b"ob").unwrap();
    req.packet().add_option(6, &[0]).unwrap();
    server.send_request(&req, peer(5683)).unwrap();

    fn notification(req: &Req, age: u16) -> Resp {
      let mut resp = Resp::for_request(req).unwrap();
      resp.set_code(crate::resp::code::CONTENT);
      resp.packet().add_option(6, &age.to_be_bytes()).ok();
      resp
    }

    respond(&server.socket, peer(5683), &notification(&req, 2));
    let first = server.poll().unwrap().expect("first notification delivered");
    assert_eq!(first.addr(), peer(5683));
    assert_eq!(server.pending.len(), 1, "the subscription is kept open");

    respond(&server.socket, peer(5683), &notification(&req, 3));
    let second = server.poll().unwrap().expect("second notification also delivered");
    assert_eq!(second.data().code(), crate::resp::code::CONTENT);
    assert_eq!(server.pending.len(), 1);

    server.stop_expecting_replies(&coap_msg::Token::new(b"ob"));
    assert!(server.pending.is_empty());
  }

  #[test]
  fn discovery_style_request_accepts_replies_from_several_peers() {
    let clock = FakeClock(Rc::new(RefCell::new(0)));
    let socket = FakeSocket::default();
    let mut server = Server::new(socket, clock, Config::default());

    let mut req = Req::get("oc/core");
    req.non();
    req.packet().set_token(b"disco").unwrap();
    server.send_request(&req, peer(5683)).unwrap();

    for responder in [peer(5001), peer(5002)] {
      let mut resp = Resp::for_request(&req).unwrap();
      resp.set_code(crate::resp::code::CONTENT);
      respond(&server.socket, responder, &resp);
    }

    let first = server.poll().unwrap().expect("first responder matched");
    let second = server.poll().unwrap().expect("second responder also matched");
    assert_ne!(first.addr(), second.addr());
    assert_eq!(server.pending.len(), 1);
  }
}
