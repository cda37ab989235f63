//! The queue of not-yet-acknowledged Confirmable messages a server or
//! client has sent, and the logic that retransmits them.

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::Id;
use embedded_time::{Clock, Instant};
use no_std_net::SocketAddr;

use crate::config::Config;
use crate::net::Addrd;
use crate::retry::{RetryTimer, YouShould};

/// A Confirmable message awaiting its ACK (or RST).
pub struct Entry<C: Clock<T = u64>> {
  id: Id,
  addr: SocketAddr,
  bytes: Vec<u8>,
  retry: RetryTimer<C>,
}

impl<C: Clock<T = u64>> core::fmt::Debug for Entry<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Entry")
     .field("id", &self.id)
     .field("addr", &self.addr)
     .field("len", &self.bytes.len())
     .finish()
  }
}

/// Queue of outbound Confirmable messages, retransmitted on the RFC
/// 7252 `ACK_TIMEOUT`/`MAX_RETRANSMIT` schedule until acknowledged,
/// rejected, or exhausted.
#[derive(Debug)]
pub struct OutgoingQueue<C: Clock<T = u64>> {
  entries: Vec<Entry<C>>,
}

impl<C: Clock<T = u64>> Default for OutgoingQueue<C> {
  fn default() -> Self {
    Self::new()
  }
}

impl<C: Clock<T = u64>> OutgoingQueue<C> {
  /// Create an empty queue.
  pub fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Enqueue `bytes` (an encoded Confirmable message addressed to
  /// `addr`, carrying message id `id`) for retransmission per `config`.
  pub fn enqueue(&mut self,
                 id: Id,
                 addr: SocketAddr,
                 bytes: Vec<u8>,
                 now: Instant<C>,
                 config: &Config) {
    let retry = RetryTimer::new(now, config.msg.con.unacked_retry_strategy, config.msg.con.max_attempts);
    self.entries.push(Entry { id, addr, bytes, retry });
  }

  /// An ACK or RST arrived for `id` from `addr`: stop retransmitting it.
  /// Returns `true` if a matching entry was found and removed.
  pub fn ack(&mut self, id: Id, addr: SocketAddr) -> bool {
    let before = self.entries.len();
    self.entries.retain(|e| !(e.id == id && e.addr == addr));
    self.entries.len() != before
  }

  /// Advance time: every entry whose retry timer has elapsed is either
  /// due for retransmission (returned in the first vector) or has
  /// exhausted its attempts (returned, removed, in the second).
  pub fn poll(&mut self, now: Instant<C>) -> (Vec<Addrd<Vec<u8>>>, Vec<Addrd<Vec<u8>>>) {
    let mut resend = Vec::new();
    let mut gave_up = Vec::new();

    let mut i = 0;
    while i < self.entries.len() {
      match self.entries[i].retry.what_should_i_do(now) {
        | Ok(YouShould::Retry) => {
          resend.push(Addrd(self.entries[i].bytes.clone(), self.entries[i].addr));
          i += 1;
        },
        | Ok(YouShould::Cry) => {
          let entry = self.entries.remove(i);
          log::warn!("giving up on message {:?} to {:?}: retransmit ceiling reached",
                     entry.id,
                     entry.addr);
          gave_up.push(Addrd(entry.bytes, entry.addr));
        },
        | Err(nb::Error::WouldBlock) => i += 1,
        | Err(nb::Error::Other(never)) => match never {},
      }
    }

    (resend, gave_up)
  }

  /// Number of messages still awaiting acknowledgement.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Is the queue empty?
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::duration::Milliseconds;
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
  fn retransmits_then_gives_up() {
    let mut config = Config::default();
    config.msg.con.unacked_retry_strategy = crate::retry::Strategy::Delay { min: Milliseconds(1000),
                                                                            max: Milliseconds(1000) };
    config.msg.con.max_attempts = crate::retry::Attempts(2);

    let mut time = 0u64;
    let clock = FakeClock(&time as *const _);
    let now = || clock.try_now().unwrap();

    let mut queue = OutgoingQueue::new();
    queue.enqueue(Id(1), addr(), vec![1, 2, 3], now(), &config);

    time = 500;
    let (resend, gone) = queue.poll(now());
    assert!(resend.is_empty());
    assert!(gone.is_empty());

    time = 1000;
    let (resend, gone) = queue.poll(now());
    assert_eq!(resend.len(), 1);
    assert!(gone.is_empty());

    time = 2000;
    let (_, gone) = queue.poll(now());
    assert_eq!(gone.len(), 1);
    assert!(queue.is_empty());
  }

  #[test]
  fn ack_removes_entry() {
    let config = Config::default();
    let time = 0u64;
    let clock = FakeClock(&time as *const _);

    let mut queue = OutgoingQueue::new();
    queue.enqueue(Id(1), addr(), vec![1], clock.try_now().unwrap(), &config);
    assert_eq!(queue.len(), 1);

    assert!(queue.ack(Id(1), addr()));
    assert!(queue.is_empty());
    assert!(!queue.ack(Id(1), addr()));
  }
}
