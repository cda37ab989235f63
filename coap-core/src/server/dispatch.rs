//! Routes decoded inbound messages to the right handler and decides
//! what, if anything, goes back out.

use core::cell::Cell;

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::{Code, CodeKind, Packet, Type};
use no_std_net::SocketAddr;

use crate::req::Req;
use crate::resp::{code, Resp};
use crate::server::observe::{Observer, ObserveRegistry};
use crate::server::resource::{HandlerFn, ResourceTable};

/// Guards against a handler re-entering the dispatcher while it is
/// already processing a message on the same thread (e.g. a handler
/// that synchronously issues its own request), and against a resource
/// being unmounted out from under the dispatch currently iterating it.
///
/// Mirrors the `in_use`/`delete_me` pattern used by reference-counted
/// CoAP implementations to make "the resource was deleted while a
/// request against it was in flight" safe instead of undefined.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
  in_use: Cell<bool>,
  delete_me: Cell<bool>,
}

impl ReentrancyGuard {
  /// Create a guard in the unused state.
  pub fn new() -> Self {
    Self::default()
  }

  /// Attempt to enter a dispatch. Returns `false` (and does not mark
  /// the guard in-use) if a dispatch is already in progress.
  pub fn enter(&self) -> bool {
    if self.in_use.get() {
      false
    } else {
      self.in_use.set(true);
      true
    }
  }

  /// Leave the dispatch entered by [`ReentrancyGuard::enter`]. Returns
  /// `true` if [`ReentrancyGuard::mark_for_deletion`] was called while
  /// this dispatch was in progress, so the caller can finalize the
  /// deferred teardown now that it's safe to do so.
  pub fn exit(&self) -> bool {
    self.in_use.set(false);
    self.delete_me.replace(false)
  }

  /// Request that whatever this guard protects be torn down. If a
  /// dispatch is in progress, the teardown is deferred until
  /// [`ReentrancyGuard::exit`] returns `true`.
  pub fn mark_for_deletion(&self) {
    self.delete_me.set(true);
  }

  /// Is a dispatch currently in progress?
  pub fn is_in_use(&self) -> bool {
    self.in_use.get()
  }
}

/// What a dispatched inbound message produced.
#[derive(Debug)]
pub enum Outcome {
  /// The sender should get this response back (already addressed).
  Respond(Packet),
  /// A ping (empty Confirmable) was rejected with a Reset.
  Reset(Packet),
  /// An ACK or RST that resolves/cancels a previously-sent request;
  /// the caller should remove it from its outgoing/pending tables.
  AckOrReset,
  /// Nothing to send back: a second message arriving while a dispatch
  /// is already in progress on this thread (re-entrancy guard), or a
  /// request whose message type carries no addressable reply (e.g. a
  /// malformed path on a NON request, or `.well-known/core` hit with a
  /// non-GET method as NON). A request with no matching resource is
  /// answered, not dropped — see `dispatch_request`'s fallback/NotFound
  /// handling.
  Drop,
}

/// Ties a [`ResourceTable`] and [`ObserveRegistry`] together and
/// decides how to answer each inbound message.
#[derive(Default)]
pub struct Dispatcher {
  /// Mounted request handlers.
  pub resources: ResourceTable,
  /// Observe subscriptions against those handlers.
  pub observe: ObserveRegistry,
  guard: ReentrancyGuard,
  fallback: Option<HandlerFn>,
}

impl core::fmt::Debug for Dispatcher {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Dispatcher")
     .field("resources", &self.resources)
     .field("observe", &self.observe)
     .field("guard", &self.guard)
     .field("fallback", &self.fallback.is_some())
     .finish()
  }
}

const WELL_KNOWN_CORE: &str = "well-known/core";

impl Dispatcher {
  /// Create an empty dispatcher.
  pub fn new() -> Self {
    Self::default()
  }

  /// Install the unknown-resource fallback handler: called, in place of
  /// the default `4.04 Not Found`, for any request whose path matches
  /// no mounted resource (and isn't `/.well-known/core`).
  pub fn set_fallback(&mut self, handler: HandlerFn) {
    self.fallback = Some(handler);
  }

  /// Handle one inbound packet from `addr`.
  pub fn dispatch(&mut self, packet: &Packet, addr: SocketAddr) -> Outcome {
    if !self.guard.enter() {
      return Outcome::Drop;
    }
    let outcome = self.dispatch_inner(packet, addr);
    self.guard.exit();
    outcome
  }

  fn dispatch_inner(&mut self, packet: &Packet, addr: SocketAddr) -> Outcome {
    match packet.code().kind() {
      | CodeKind::Empty if packet.ty() == Type::Con => {
        // An empty CON is a ping: reject it so the sender stops retrying.
        Outcome::Reset(Packet::reset_for(packet))
      },
      | CodeKind::Empty => Outcome::AckOrReset,
      | CodeKind::Response => Outcome::AckOrReset,
      | CodeKind::Request => self.dispatch_request(packet, addr),
    }
  }

  fn dispatch_request(&mut self, packet: &Packet, addr: SocketAddr) -> Outcome {
    let req = Req::from(packet.clone());

    let path = match req.path() {
      | Ok(path) => path,
      | Err(_) => {
        let mut resp = Resp::for_request(&req).unwrap_or_else(|| Resp::non(&req));
        resp.set_code(code::BAD_OPTION);
        return Outcome::Respond(resp.packet().clone());
      },
    };

    if path == WELL_KNOWN_CORE {
      return self.dispatch_well_known_core(&req);
    }

    // 0 = register, 1 = deregister, anything else is not a subscription request.
    let observe = packet.first_option(6).ok().map(|v| v.first().copied().unwrap_or(0));

    let handler = match self.resources.handler(&path) {
      | Some(h) => h,
      | None => match &self.fallback {
        | Some(fallback) => return Outcome::Respond(fallback(&req).packet().clone()),
        | None => {
          return match Resp::for_request(&req) {
                   | Some(mut resp) => {
                     resp.set_code(code::NOT_FOUND);
                     Outcome::Respond(resp.packet().clone())
                   },
                   | None => Outcome::Drop,
                 };
        },
      },
    };

    if observe == Some(1) {
      self.observe.deregister(&path, addr, req.packet().token());
    }

    let mut resp = handler(&req);

    if observe == Some(0) && self.resources.is_observable(&path) {
      self.observe.register(&path,
                            Observer { addr, token: req.packet().token() });
      let age = self.observe.next_age(&path);
      resp.packet().add_option(6, &age.to_be_bytes()).ok();
    }

    Outcome::Respond(resp.packet().clone())
  }

  fn dispatch_well_known_core(&mut self, req: &Req) -> Outcome {
    if req.method() != crate::req::Method::GET {
      return match Resp::for_request(req) {
               | Some(mut resp) => {
                 resp.set_code(code::METHOD_NOT_ALLOWED);
                 Outcome::Respond(resp.packet().clone())
               },
               | None => Outcome::Drop,
             };
    }

    match Resp::for_request(req) {
      | Some(mut resp) => {
        resp.set_code(code::CONTENT);
        resp.set_payload(&self.resources.well_known_core());
        Outcome::Respond(resp.packet().clone())
      },
      | None => Outcome::Drop,
    }
  }

  /// Notify every observer of `path` with a fresh representation,
  /// returning one addressed packet per observer.
  pub fn notify(&mut self, path: &str, payload: &[u8]) -> Vec<crate::net::Addrd<Packet>> {
    if self.observe.observers(path).is_empty() {
      return Vec::new();
    }

    let age = self.observe.next_age(path);
    self.observe
        .observers(path)
        .to_vec()
        .into_iter()
        .map(|observer| {
          let p = Packet::new();
          p.set_type(Type::Non);
          p.set_code(Code::new(2, 5));
          p.set_token(observer.token.as_bytes()).ok();
          p.add_option(6, &age.to_be_bytes()).ok();
          p.set_payload(payload);
          crate::net::Addrd(p, observer.addr)
        })
        .collect()
  }

  /// Notify every observer of `path` with a packet `compose` builds
  /// fresh for each one. `compose` receives the observer being
  /// notified and returns the representation's response code and
  /// payload; returning [`code::UNAUTHORIZED`] omits that observer from
  /// this round without erroring the whole notification.
  pub fn notify_with(&mut self,
                      path: &str,
                      mut compose: impl FnMut(&Observer) -> (Code, Vec<u8>))
                      -> Vec<crate::net::Addrd<Packet>> {
    if self.observe.observers(path).is_empty() {
      return Vec::new();
    }

    let age = self.observe.next_age(path);
    self.observe
        .observers(path)
        .to_vec()
        .into_iter()
        .filter_map(|observer| {
          let (code, payload) = compose(&observer);
          if code == code::UNAUTHORIZED {
            return None;
          }
          let p = Packet::new();
          p.set_type(Type::Non);
          p.set_code(code);
          p.set_token(observer.token.as_bytes()).ok();
          p.add_option(6, &age.to_be_bytes()).ok();
          p.set_payload(&payload);
          Some(crate::net::Addrd(p, observer.addr))
        })
        .collect()
  }
}
