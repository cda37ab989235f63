//! Keep a resource's representation up to date: a real Observe
//! subscription when the resource advertises it, or periodic polling
//! when it doesn't.

#[cfg(feature = "alloc")]
use std_alloc::string::{String, ToString};

use coap_core::req::Req;
use coap_msg::Token;
use embedded_time::duration::Milliseconds;
use embedded_time::{Clock, Instant};
use no_std_net::SocketAddr;

use crate::discovery::Resource;

const OBSERVE: u16 = 6;
const OBSERVE_REGISTER: &[u8] = &[0];
const OBSERVE_DEREGISTER: &[u8] = &[1];

/// Cadence at which a non-observable resource is polled, per the
/// fixed fallback interval: every 10 seconds.
pub const POLL_CADENCE_MILLIS: u64 = 10_000;

/// A live subscription to a resource's representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Session<C: Clock<T = u64>> {
  /// The resource advertised Observe support; notifications arrive
  /// through the normal pending-reply path, matched by `token`.
  Observing {
    /// Who to talk to.
    addr: SocketAddr,
    /// The resource's path.
    href: String,
    /// The token the registering GET used.
    token: Token,
  },
  /// The resource did not advertise Observe support; [`Session::poll`]
  /// issues a plain GET every [`POLL_CADENCE_MILLIS`] instead.
  Polling {
    /// Who to talk to.
    addr: SocketAddr,
    /// The resource's path.
    href: String,
    /// When the last poll GET was sent, if any.
    last_poll: Option<Instant<C>>,
  },
}

impl<C: Clock<T = u64>> Session<C> {
  /// Begin a session against `resource`, choosing Observe or polling
  /// based on whether it advertised observability. `token` is the
  /// token the registering GET (built by [`Session::register`]) will
  /// carry; it is ignored for a polling session.
  pub fn start(resource: &Resource, token: Token) -> Self {
    if resource.observable {
      Session::Observing { addr: resource.peer,
                           href: resource.href.to_string(),
                           token }
    } else {
      Session::Polling { addr: resource.peer,
                         href: resource.href.to_string(),
                         last_poll: None }
    }
  }

  /// The Confirmable GET that begins this session: carries `Observe:
  /// 0` for an [`Session::Observing`] session, and is a plain GET for
  /// a [`Session::Polling`] one (its first poll).
  pub fn register(&self) -> Req {
    match self {
      | Session::Observing { href, token, .. } => {
        let req = Req::get(href.as_str());
        req.packet()
           .set_token(token.as_bytes())
           .expect("a fresh request accepts any token up to 8 bytes");
        req.packet()
           .add_option(OBSERVE, OBSERVE_REGISTER)
           .expect("Observe is the first option appended to a fresh GET");
        req
      },
      | Session::Polling { href, .. } => Req::get(href.as_str()),
    }
  }

  /// Drive the polling fallback: returns the next poll GET once
  /// [`POLL_CADENCE_MILLIS`] has elapsed since the last one (or
  /// immediately, if none has been sent yet). Always `None` for an
  /// [`Session::Observing`] session, since the server pushes
  /// notifications without being asked again.
  pub fn poll(&mut self, now: Instant<C>) -> Option<Req> {
    match self {
      | Session::Observing { .. } => None,
      | Session::Polling { href, last_poll, .. } => {
        let due = match last_poll {
          | None => true,
          | Some(last) => {
            let elapsed: Milliseconds<u64> =
              (now - *last).try_into().unwrap_or(Milliseconds(u64::MAX));
            elapsed.0 >= POLL_CADENCE_MILLIS
          },
        };

        if due {
          *last_poll = Some(now);
          Some(Req::get(href.as_str()))
        } else {
          None
        }
      },
    }
  }

  /// The Confirmable GET that ends an [`Session::Observing`] session
  /// (`Observe: 1`). `None` for a polling session, which has nothing
  /// server-side to tear down.
  pub fn deregister(&self) -> Option<Req> {
    match self {
      | Session::Observing { href, token, .. } => {
        let req = Req::get(href.as_str());
        req.packet()
           .set_token(token.as_bytes())
           .expect("a fresh request accepts any token up to 8 bytes");
        req.packet()
           .add_option(OBSERVE, OBSERVE_DEREGISTER)
           .expect("Observe is the first option appended to a fresh GET");
        Some(req)
      },
      | Session::Polling { .. } => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::rate::Fraction;

  use super::*;

  struct FakeClock(core::cell::Cell<u64>);

  impl Clock for FakeClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
      Ok(Instant::new(self.0.get()))
    }
  }

  fn resource(observable: bool) -> Resource {
    Resource { peer: SocketAddr::from(([127, 0, 0, 1], 5683)),
              href: "/a/light".into(),
              resource_types: Vec::new(),
              interfaces: Vec::new(),
              observable }
  }

  #[test]
  fn observable_resource_registers_with_observe_zero() {
    let session = Session::<FakeClock>::start(&resource(true), Token::new(b"tok"));
    let req = session.register();
    assert_eq!(req.packet().first_option(OBSERVE).unwrap(), OBSERVE_REGISTER);
  }

  #[test]
  fn observing_session_never_polls() {
    let clock = FakeClock(core::cell::Cell::new(0));
    let mut session = Session::start(&resource(true), Token::new(b"tok"));
    assert!(session.poll(clock.try_now().unwrap()).is_none());
  }

  #[test]
  fn polling_session_respects_cadence() {
    let clock = FakeClock(core::cell::Cell::new(0));
    let mut session = Session::start(&resource(false), Token::new(b"tok"));

    assert!(session.poll(clock.try_now().unwrap()).is_some());
    assert!(session.poll(clock.try_now().unwrap()).is_none());

    clock.0.set(POLL_CADENCE_MILLIS);
    assert!(session.poll(clock.try_now().unwrap()).is_some());
  }

  #[test]
  fn deregister_only_applies_to_observing() {
    let observing = Session::<FakeClock>::start(&resource(true), Token::new(b"tok"));
    assert!(observing.deregister().is_some());

    let polling = Session::<FakeClock>::start(&resource(false), Token::new(b"tok"));
    assert!(polling.deregister().is_none());
  }
}
