//! Bit-exact primitives for the fixed portion of the CoAP header:
//! version, message type, code, message id, and token.
//!
//! These map 1:1 onto RFC 7252 §3's `ver`/`t`/`tkl`/`code`/`message ID`
//! fields.

use blake2::digest::typenum::U8;
use blake2::{Blake2b, Digest};

/// The CoAP protocol version. The only legal value on the wire is `1`;
/// any other value is rejected by the decoder with `Error::Unsupported`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u8);

impl Default for Version {
  fn default() -> Self {
    Version(1)
  }
}

/// Message type: whether this message must be acknowledged, and whether
/// it is itself an acknowledgement or rejection of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
  /// Sent reliably; the sender retransmits until an ACK (or RST) arrives.
  Con,
  /// Sent with no reliability guarantee.
  Non,
  /// Acknowledges a `Con`, optionally piggy-backing a response.
  Ack,
  /// Rejects a `Con` the receiver could not process (e.g. a ping).
  Reset,
}

impl From<Type> for u8 {
  fn from(ty: Type) -> u8 {
    match ty {
      | Type::Con => 0,
      | Type::Non => 1,
      | Type::Ack => 2,
      | Type::Reset => 3,
    }
  }
}

impl TryFrom<u8> for Type {
  type Error = u8;

  fn try_from(b: u8) -> Result<Self, u8> {
    match b {
      | 0 => Ok(Type::Con),
      | 1 => Ok(Type::Non),
      | 2 => Ok(Type::Ack),
      | 3 => Ok(Type::Reset),
      | other => Err(other),
    }
  }
}

/// A request method or response status, packed on the wire as
/// `[class: 3 bits][detail: 5 bits]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Code {
  /// High 3 bits. `0` means this is a request (or the Empty code);
  /// `2`..`5` mean this is a response.
  pub class: u8,
  /// Low 5 bits.
  pub detail: u8,
}

/// What kind of message a [`Code`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeKind {
  /// `0.00`; an empty CoAP message (ping, RST, bare ACK).
  Empty,
  /// `0.xx`, `xx != 00`; a request method.
  Request,
  /// `c.xx`, `c != 0`; a response status.
  Response,
}

impl Code {
  /// Build a code from class/detail.
  pub const fn new(class: u8, detail: u8) -> Self {
    Code { class, detail }
  }

  /// `0.00`
  pub const EMPTY: Code = Code::new(0, 0);
  /// `0.01`
  pub const GET: Code = Code::new(0, 1);
  /// `0.02`
  pub const POST: Code = Code::new(0, 2);
  /// `0.03`
  pub const PUT: Code = Code::new(0, 3);
  /// `0.04`
  pub const DELETE: Code = Code::new(0, 4);

  /// Is this an empty message, a request, or a response?
  pub const fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Render as `"c.dd"`, e.g. `Code::new(2, 5)` -> `"2.05"`.
  pub fn to_human(&self) -> [char; 4] {
    let class = (b'0' + self.class) as char;
    let tens = (b'0' + (self.detail / 10)) as char;
    let ones = (b'0' + (self.detail % 10)) as char;
    [class, '.', tens, ones]
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    Code { class: b >> 5,
           detail: b & 0b0001_1111 }
  }
}

impl From<Code> for u8 {
  fn from(c: Code) -> u8 {
    (c.class << 5) | (c.detail & 0b0001_1111)
  }
}

/// The 16-bit message id used to detect duplicates and to correlate an
/// ACK/RST with the confirmable message it answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u16);

impl Id {
  /// Parse a big-endian 2-byte id.
  pub fn from_be_bytes(bytes: [u8; 2]) -> Self {
    Id(u16::from_be_bytes(bytes))
  }

  /// The next id in sequence, wrapping at `u16::MAX`.
  pub fn next(self) -> Self {
    Id(self.0.wrapping_add(1))
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

/// A 0-8 byte opaque value correlating a request with its (possibly
/// late, possibly reordered) response, independent of the message id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Token(pub tinyvec::ArrayVec<[u8; 8]>);

impl Token {
  /// Build an opaque token by hashing `data` down to 8 bytes with Blake2b.
  ///
  /// Used by callers that want a token correlated with some identifying
  /// data (e.g. a resource path) without storing that data directly.
  pub fn opaque(data: &[u8]) -> Token {
    let mut hasher = Blake2b::<U8>::new();
    hasher.update(data);
    let out: [u8; 8] = hasher.finalize().into();
    Token(tinyvec::ArrayVec::from(out))
  }

  /// Build a token from a byte slice; silently truncates beyond 8 bytes.
  pub fn new(bytes: &[u8]) -> Token {
    let mut v = tinyvec::ArrayVec::<[u8; 8]>::new();
    v.extend_from_slice(&bytes[..bytes.len().min(8)]);
    Token(v)
  }

  /// Borrow the token bytes.
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_class_detail() {
    let c = Code::from(0b010_00101);
    assert_eq!(c.class, 2);
    assert_eq!(c.detail, 5);
    assert_eq!(c.to_human(), ['2', '.', '0', '5']);
    assert_eq!(u8::from(c), 0b010_00101);
  }

  #[test]
  fn code_kind() {
    assert_eq!(Code::EMPTY.kind(), CodeKind::Empty);
    assert_eq!(Code::GET.kind(), CodeKind::Request);
    assert_eq!(Code::new(2, 5).kind(), CodeKind::Response);
  }

  #[test]
  fn type_roundtrip() {
    for (ty, byte) in [(Type::Con, 0), (Type::Non, 1), (Type::Ack, 2), (Type::Reset, 3)] {
      assert_eq!(u8::from(ty), byte);
      assert_eq!(Type::try_from(byte), Ok(ty));
    }
  }

  #[test]
  fn id_bytes() {
    let id = Id::from_be_bytes([0x12, 0x34]);
    assert_eq!(id, Id(0x1234));
    assert_eq!(<[u8; 2]>::from(id), [0x12, 0x34]);
  }
}
