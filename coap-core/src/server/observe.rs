//! Server-side bookkeeping for the Observe extension (RFC 7641).

#[cfg(feature = "alloc")]
use std_alloc::collections::BTreeMap;
#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::Token;
use no_std_net::SocketAddr;

/// One client's registered interest in a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observer {
  /// Where to send notifications.
  pub addr: SocketAddr,
  /// The token the client's registering GET used; notifications must
  /// echo it so the client can correlate them with the subscription.
  pub token: Token,
}

#[derive(Debug, Default)]
struct Subscription {
  age: u16,
  observers: Vec<Observer>,
}

/// Registry of per-resource observers and their monotonic sequence
/// numbers.
///
/// The sequence ("age") counter is seeded at 2 and wraps from 65535
/// back to 2, skipping 0 and 1 so a freshly-registered observer can
/// never mistake the first notification it receives for a duplicate of
/// the registering response (which carries no Observe option at all,
/// and thus is not ordered against it).
#[derive(Debug, Default)]
pub struct ObserveRegistry {
  resources: BTreeMap<String, Subscription>,
}

impl ObserveRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `observer`'s interest in `path`. An observer's identity is
  /// the pair `(addr, token)`: a repeat registration of the same pair is
  /// coalesced (no duplicate entry), but the same address registering
  /// with a *different* token is a distinct observer, not a refresh of
  /// the existing one — a client may hold more than one subscription to
  /// the same resource concurrently, each tracked by its own token.
  pub fn register(&mut self, path: &str, observer: Observer) {
    let sub = self.resources.entry(path.into()).or_insert_with(|| Subscription { age: 2,
                                                                                 observers:
                                                                                   Vec::new() });
    let exists = sub.observers
                    .iter()
                    .any(|o| o.addr == observer.addr && o.token == observer.token);
    if !exists {
      sub.observers.push(observer);
    }
  }

  /// Remove the `(addr, token)` subscription to `path`, if any. Another
  /// subscription from the same `addr` under a different token is left
  /// untouched.
  pub fn deregister(&mut self, path: &str, addr: SocketAddr, token: Token) {
    if let Some(sub) = self.resources.get_mut(path) {
      sub.observers.retain(|o| !(o.addr == addr && o.token == token));
    }
  }

  /// Remove every subscription held by `addr` (e.g. on RST).
  pub fn deregister_all(&mut self, addr: SocketAddr) {
    for sub in self.resources.values_mut() {
      sub.observers.retain(|o| o.addr != addr);
    }
  }

  /// The observers currently registered against `path`.
  pub fn observers(&self, path: &str) -> &[Observer] {
    self.resources.get(path).map(|s| s.observers.as_slice()).unwrap_or(&[])
  }

  /// Advance and return the next sequence number to stamp on a
  /// notification for `path`.
  pub fn next_age(&mut self, path: &str) -> u16 {
    let sub = self.resources.entry(path.into()).or_insert_with(|| Subscription { age: 2,
                                                                                 observers:
                                                                                   Vec::new() });
    let age = sub.age;
    sub.age = if sub.age == u16::MAX { 2 } else { sub.age + 1 };
    age
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
  }

  #[test]
  fn register_and_list() {
    let mut reg = ObserveRegistry::new();
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"a") });
    reg.register("temp",
                 Observer { addr: addr(2), token: Token::new(b"b") });

    assert_eq!(reg.observers("temp").len(), 2);
  }

  #[test]
  fn same_address_different_token_is_a_distinct_observer() {
    let mut reg = ObserveRegistry::new();
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"a") });
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"z") });

    assert_eq!(reg.observers("temp").len(), 2);
  }

  #[test]
  fn duplicate_addr_token_pair_is_coalesced() {
    let mut reg = ObserveRegistry::new();
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"a") });
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"a") });

    assert_eq!(reg.observers("temp").len(), 1);
  }

  #[test]
  fn deregister_removes_only_the_matching_token() {
    let mut reg = ObserveRegistry::new();
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"a") });
    reg.register("temp",
                 Observer { addr: addr(1), token: Token::new(b"z") });
    reg.deregister("temp", addr(1), Token::new(b"a"));

    assert_eq!(reg.observers("temp").len(), 1);
    assert_eq!(reg.observers("temp")[0].token, Token::new(b"z"));
  }

  #[test]
  fn age_seeds_at_two_and_wraps() {
    let mut reg = ObserveRegistry::new();
    assert_eq!(reg.next_age("temp"), 2);
    assert_eq!(reg.next_age("temp"), 3);

    // Force the wraparound without ticking 65533 times.
    reg.resources.get_mut("temp").unwrap().age = u16::MAX;
    assert_eq!(reg.next_age("temp"), u16::MAX);
    assert_eq!(reg.next_age("temp"), 2);
  }
}
