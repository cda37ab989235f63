//! Table of requests a client has sent and is still waiting to hear
//! back about.

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::{Id, Token};
use embedded_time::{Clock, Instant};
use embedded_time::duration::Milliseconds;
use no_std_net::SocketAddr;

use crate::config::Config;

/// A request that has been sent and is awaiting a reply.
#[derive(Clone)]
pub struct Pending<C: Clock<T = u64>> {
  /// The message id of the outbound request.
  pub id: Id,
  /// The token of the outbound request; replies are correlated by
  /// token first, since responses to NON requests and separate
  /// responses to CON requests do not share the request's message id.
  pub token: Token,
  /// Who the request was sent to. For a one-shot entry a reply must
  /// come from exactly this address; a [`Pending::keep`] entry accepts
  /// replies from any sender, since it was sent Non-confirmable and
  /// may be answered by several peers (multicast discovery) or many
  /// times by the same one (an Observe subscription).
  pub addr: SocketAddr,
  /// Non-confirmable requests expect an unknown number of replies, from
  /// an unknown set of senders, so a match against this entry does not
  /// remove it — the caller (or [`PendingTable::remove`]) decides when
  /// it's done. Confirmable requests expect exactly one reply and are
  /// removed as soon as it arrives.
  keep: bool,
  sent_at: Instant<C>,
}

impl<C: Clock<T = u64>> core::fmt::Debug for Pending<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Pending")
     .field("id", &self.id)
     .field("token", &self.token)
     .field("addr", &self.addr)
     .field("keep", &self.keep)
     .finish()
  }
}

/// Requests awaiting a reply, and the logic that expires them after
/// the global per-request timeout.
#[derive(Debug)]
pub struct PendingTable<C: Clock<T = u64>> {
  pending: Vec<Pending<C>>,
}

impl<C: Clock<T = u64>> Default for PendingTable<C> {
  fn default() -> Self {
    Self::new()
  }
}

impl<C: Clock<T = u64>> PendingTable<C> {
  /// Create an empty table.
  pub fn new() -> Self {
    Self { pending: Vec::new() }
  }

  /// Record that a one-shot (Confirmable) request was just sent: a
  /// reply must come from `addr` and resolves (removes) this entry.
  pub fn insert(&mut self, id: Id, token: Token, addr: SocketAddr, sent_at: Instant<C>) {
    self.pending.push(Pending { id, token, addr, keep: false, sent_at });
  }

  /// Record that a Non-confirmable request was just sent, expecting
  /// any number of replies from any number of peers (an Observe
  /// registration, or a multicast discovery request): matches are not
  /// removed automatically, and are accepted from any sender.
  pub fn insert_keep(&mut self, id: Id, token: Token, addr: SocketAddr, sent_at: Instant<C>) {
    self.pending.push(Pending { id, token, addr, keep: true, sent_at });
  }

  /// A reply arrived from `addr` carrying `token`: find the matching
  /// pending request, if any. A [`Pending::keep`] entry is matched by
  /// token alone (any sender) and left in the table; any other entry
  /// must also match `addr`, and is removed once found.
  pub fn resolve(&mut self, token: &Token, addr: SocketAddr) -> Option<Pending<C>> {
    if let Some(p) = self.pending.iter().find(|p| p.keep && &p.token == token) {
      return Some(p.clone());
    }

    let ix = self.pending
                .iter()
                .position(|p| !p.keep && &p.token == token && p.addr == addr)?;
    Some(self.pending.remove(ix))
  }

  /// Stop expecting further replies for `token` (e.g. an Observe
  /// deregistration, or a closed discovery window). No-op if there is
  /// no matching entry.
  pub fn remove(&mut self, token: &Token) -> Option<Pending<C>> {
    let ix = self.pending.iter().position(|p| &p.token == token)?;
    Some(self.pending.remove(ix))
  }

  /// Drop and return every one-shot pending request whose global
  /// timeout has elapsed as of `now`. [`Pending::keep`] entries have no
  /// fixed lifetime and are never expired here; they live until
  /// [`PendingTable::remove`] is called on them.
  pub fn expire(&mut self, now: Instant<C>, config: &Config) -> Vec<Pending<C>> {
    let timeout = Milliseconds(config.pending_reply_timeout_millis());

    let mut expired = Vec::new();
    let mut i = 0;
    while i < self.pending.len() {
      if self.pending[i].keep {
        i += 1;
        continue;
      }

      let elapsed = now - self.pending[i].sent_at;
      let elapsed: Milliseconds<u64> = elapsed.try_into().unwrap_or(Milliseconds(u64::MAX));

      if elapsed >= timeout {
        expired.push(self.pending.remove(i));
      } else {
        i += 1;
      }
    }
    expired
  }

  /// Number of requests currently awaiting a reply.
  pub fn len(&self) -> usize {
    self.pending.len()
  }

  /// Is the table empty?
  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::rate::Fraction;

  use super::*;

  struct FakeClock(*const u64);

  impl Clock for FakeClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
      unsafe { Ok(Instant::new(*self.0)) }
    }
  }

  fn addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5683))
  }

  #[test]
  fn resolve_matches_by_token_and_addr() {
    let mut time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = || clock.try_now().unwrap();

    let mut table = PendingTable::new();
    table.insert(Id(1), Token::new(b"tok"), addr(), now());

    time = 10;
    assert!(table.resolve(&Token::new(b"nope"), addr()).is_none());
    let resolved = table.resolve(&Token::new(b"tok"), addr()).unwrap();
    assert_eq!(resolved.id, Id(1));
    assert!(table.is_empty());
  }

  #[test]
  fn expire_drops_stale_requests() {
    let mut time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = || clock.try_now().unwrap();
    let config = Config::default();

    let mut table = PendingTable::new();
    table.insert(Id(1), Token::new(b"tok"), addr(), now());

    time = config.pending_reply_timeout_millis() - 1;
    assert!(table.expire(now(), &config).is_empty());

    time = config.pending_reply_timeout_millis();
    let expired = table.expire(now(), &config);
    assert_eq!(expired.len(), 1);
    assert!(table.is_empty());
  }

  #[test]
  fn kept_entry_survives_repeated_matches_from_any_sender() {
    let mut time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = || clock.try_now().unwrap();
    let other_peer = SocketAddr::from(([10, 0, 0, 2], 5683));

    let mut table = PendingTable::new();
    table.insert_keep(Id(1), Token::new(b"tok"), addr(), now());

    time = 10;
    let first = table.resolve(&Token::new(b"tok"), addr()).unwrap();
    assert_eq!(first.id, Id(1));
    assert_eq!(table.len(), 1);

    // A second, unrelated peer answering the same (e.g. multicast)
    // request also matches, since a kept entry ignores the sender.
    let second = table.resolve(&Token::new(b"tok"), other_peer).unwrap();
    assert_eq!(second.id, Id(1));
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn kept_entry_is_never_expired() {
    let mut time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = || clock.try_now().unwrap();
    let config = Config::default();

    let mut table = PendingTable::new();
    table.insert_keep(Id(1), Token::new(b"tok"), addr(), now());

    time = config.pending_reply_timeout_millis() * 1000;
    assert!(table.expire(now(), &config).is_empty());
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn remove_drops_a_kept_entry_on_deregister() {
    let time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = clock.try_now().unwrap();

    let mut table = PendingTable::new();
    table.insert_keep(Id(1), Token::new(b"tok"), addr(), now);

    assert!(table.remove(&Token::new(b"tok")).is_some());
    assert!(table.is_empty());
    assert!(table.remove(&Token::new(b"tok")).is_none());
  }
}
