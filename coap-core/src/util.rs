//! Small helpers that don't have an obvious home elsewhere.
use core::fmt::Write;
use core::ops::{Div, Mul};

use coap_common::{GetSize, Writable};
use tinyvec::ArrayVec;

/// A map stored completely on the stack.
pub type StackMap<K, V, const N: usize> = ArrayVec<[(K, V); N]>;

/// String with capacity of 1KB, used for log lines and path buffers.
#[derive(Debug, Copy, Clone, Default)]
pub struct String1Kb(Writable<ArrayVec<[u8; 1024]>>);

impl PartialEq for String1Kb {
  fn eq(&self, other: &Self) -> bool {
    self.0.as_str() == other.0.as_str()
  }
}

impl Eq for String1Kb {}

impl core::fmt::Write for String1Kb {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    self.0.write_str(s)
  }
}

impl<'a> From<&'a str> for String1Kb {
  fn from(s: &'a str) -> Self {
    let mut arr = Writable::default();
    ArrayVec::extend_from_slice(&mut arr, s.as_bytes());

    Self(arr)
  }
}

impl AsRef<str> for String1Kb {
  fn as_ref(&self) -> &str {
    self.0.as_str()
  }
}

pub(crate) trait Capacity: GetSize {
  fn capacity(&self) -> Option<f32> {
    Self::CAPACITY.map(|max| self.get_size() as f32 / max as f32)
  }

  fn capacity_pct(&self) -> Option<f32> {
    self.capacity().map(|dec| dec.mul(10000.).round().div(100.))
  }
}

impl<T: GetSize> Capacity for T {}

pub(crate) fn code_to_human(code: coap_msg::Code) -> Writable<ArrayVec<[u8; 4]>> {
  let mut buf: Writable<ArrayVec<[u8; 4]>> = Writable::default();
  code.to_human().iter().for_each(|char| {
                          write!(buf, "{}", char).ok();
                        });
  buf
}
