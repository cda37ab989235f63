//! The packet object: a reference-counted, growable byte buffer that *is*
//! the wire form of a CoAP message at every point in its life. Header
//! setters, option appends, and payload writes all mutate the same
//! buffer in place; `encode` is therefore close to a no-op and `decode`
//! is close to "validate, then keep the bytes".

#[cfg(feature = "alloc")]
use std_alloc::rc::{Rc, Weak};
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;
use core::cell::RefCell;

use coap_common::Error;

use crate::opt::{read_opt_head, OptDelta, OptHead};
use crate::wire::{Code, Id, Token, Type, Version};

#[derive(Debug, Default)]
struct Inner {
  buf: Vec<u8>,
  /// Index of the first payload byte, or `0` if no payload marker has
  /// been written yet (`0` can never be a real payload start -- the
  /// header alone is already 4 bytes).
  payload_start: usize,
  /// The option number most recently appended, used to enforce the
  /// non-decreasing order invariant and compute the next delta.
  last_option: Option<u16>,
}

/// A CoAP packet: header, token, options, and optional payload, stored
/// as one contiguous, reference-counted buffer.
///
/// Cloning a `Packet` clones the handle, not the bytes -- all clones
/// observe the same mutations, matching the original's reference-counted
/// ownership model. This lets an outgoing entry and its corresponding
/// pending reply share one packet without copying it.
#[derive(Debug, Clone)]
pub struct Packet {
  inner: Rc<RefCell<Inner>>,
}

impl PartialEq for Packet {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner) || self.inner.borrow().buf == other.inner.borrow().buf
  }
}

impl Default for Packet {
  fn default() -> Self {
    Self::new()
  }
}

impl Packet {
  /// Create an empty packet: version 1, type CON, code Empty, id 0, no
  /// token, no options, no payload.
  pub fn new() -> Self {
    let buf = vec![0b0100_0000, 0, 0, 0];
    Self { inner: Rc::new(RefCell::new(Inner { buf, payload_start: 0, last_option: None })) }
  }

  /// A weak, non-owning reference to this packet.
  ///
  /// Outgoing entries and pending replies that should not keep the
  /// packet alive on their own (see [`crate`] docs on shared ownership)
  /// hold this instead of a `Packet`.
  pub fn downgrade(&self) -> WeakPacket {
    WeakPacket { inner: Rc::downgrade(&self.inner) }
  }

  fn header_byte(&self) -> u8 {
    self.inner.borrow().buf[0]
  }

  fn set_header_byte(&self, f: impl FnOnce(u8) -> u8) {
    let mut inner = self.inner.borrow_mut();
    inner.buf[0] = f(inner.buf[0]);
  }

  /// Always `1`; the only version this codec understands.
  pub fn version(&self) -> Version {
    Version(self.header_byte() >> 6)
  }

  /// Accepts only `1`; any other value is rejected without mutating the
  /// packet.
  pub fn set_version(&self, v: u8) -> Result<(), Error> {
    if v != 1 {
      return Err(Error::Unsupported);
    }
    self.set_header_byte(|b| (b & 0b0011_1111) | (v << 6));
    Ok(())
  }

  /// The message type (CON/NON/ACK/RST).
  pub fn ty(&self) -> Type {
    Type::try_from((self.header_byte() >> 4) & 0b11).unwrap()
  }

  /// Overwrite the message type in place; never shifts token/options/payload.
  pub fn set_type(&self, ty: Type) {
    let bits: u8 = ty.into();
    self.set_header_byte(|b| (b & 0b1100_1111) | (bits << 4));
  }

  /// The method-or-response code.
  pub fn code(&self) -> Code {
    Code::from(self.inner.borrow().buf[1])
  }

  /// Overwrite the code in place.
  pub fn set_code(&self, code: Code) {
    self.inner.borrow_mut().buf[1] = code.into();
  }

  /// The 16-bit message id.
  pub fn id(&self) -> Id {
    let inner = self.inner.borrow();
    Id::from_be_bytes([inner.buf[2], inner.buf[3]])
  }

  /// Overwrite the message id in place.
  pub fn set_id(&self, id: Id) {
    let bytes: [u8; 2] = id.into();
    let mut inner = self.inner.borrow_mut();
    inner.buf[2] = bytes[0];
    inner.buf[3] = bytes[1];
  }

  fn tkl(&self) -> usize {
    (self.header_byte() & 0b1111) as usize
  }

  /// The token bytes (0..8 of them).
  pub fn token(&self) -> Token {
    let inner = self.inner.borrow();
    let tkl = (inner.buf[0] & 0b1111) as usize;
    Token::new(&inner.buf[4..4 + tkl])
  }

  /// Replace the token, inserting or removing bytes as needed and
  /// shifting every option/payload byte that follows. Fails with
  /// `InvalidArgument` if `token` is longer than 8 bytes.
  pub fn set_token(&self, token: &[u8]) -> Result<(), Error> {
    if token.len() > 8 {
      return Err(Error::InvalidArgument);
    }

    let mut inner = self.inner.borrow_mut();
    let old_tkl = (inner.buf[0] & 0b1111) as usize;
    let shift = token.len() as isize - old_tkl as isize;

    inner.buf.splice(4..4 + old_tkl, token.iter().copied());
    inner.buf[0] = (inner.buf[0] & 0b1111_0000) | (token.len() as u8);

    if inner.payload_start != 0 {
      inner.payload_start = (inner.payload_start as isize + shift) as usize;
    }

    Ok(())
  }

  fn options_region(&self) -> (usize, usize) {
    let inner = self.inner.borrow();
    let tkl = (inner.buf[0] & 0b1111) as usize;
    let start = 4 + tkl;
    let end = if inner.payload_start != 0 { inner.payload_start - 1 } else { inner.buf.len() };
    (start, end)
  }

  /// Append an option, preserving the non-decreasing option-code
  /// invariant.
  ///
  /// Fails with `OutOfOrder` if `number` is smaller than the largest
  /// option number already present, and with `InvalidArgument` if the
  /// payload marker has already been written (invariant (iii): once
  /// payload-start is set, no further options may be appended).
  pub fn add_option(&self, number: u16, value: &[u8]) -> Result<(), Error> {
    let mut inner = self.inner.borrow_mut();

    if inner.payload_start != 0 {
      return Err(Error::InvalidArgument);
    }

    if let Some(last) = inner.last_option {
      if number < last {
        return Err(Error::OutOfOrder);
      }
    }

    let delta = number as u32 - inner.last_option.unwrap_or(0) as u32;
    let opt = crate::opt::Opt { number: crate::opt::OptNumber(number),
                                 value };
    opt.encode(OptDelta(delta as u16), &mut inner.buf);
    inner.last_option = Some(number);

    Ok(())
  }

  /// Iterate over every option in wire order as `(number, value)` pairs.
  pub fn options(&self) -> Vec<(u16, Vec<u8>)> {
    let inner = self.inner.borrow();
    let (start, end) = self.options_region();
    let mut cur = coap_common::Cursor::new(&inner.buf[start..end]);
    let mut current = 0u32;
    let mut out = Vec::new();

    while !cur.until_end().is_empty() {
      match read_opt_head(&mut cur) {
        | Ok(OptHead::Opt(delta, len)) => {
          current += delta.0 as u32;
          let value = cur.take(len).to_vec();
          out.push((current as u16, value));
        },
        | _ => break,
      }
    }

    out
  }

  /// Every value registered under `number`, in wire order.
  pub fn find_options(&self, number: u16) -> Vec<Vec<u8>> {
    self.options().into_iter().filter(|(n, _)| *n == number).map(|(_, v)| v).collect()
  }

  /// The first value registered under `number`, if any.
  pub fn first_option(&self, number: u16) -> Result<Vec<u8>, Error> {
    self.find_options(number).into_iter().next().ok_or(Error::NoSuchOption)
  }

  /// Append bytes to the payload, writing the `0xFF` marker first if this
  /// is the first payload write.
  pub fn append_payload(&self, bytes: &[u8]) {
    let mut inner = self.inner.borrow_mut();
    if inner.payload_start == 0 {
      inner.buf.push(0xFF);
      inner.payload_start = inner.buf.len();
    }
    inner.buf.extend_from_slice(bytes);
  }

  /// Replace the payload wholesale.
  pub fn set_payload(&self, bytes: &[u8]) {
    let mut inner = self.inner.borrow_mut();
    if inner.payload_start == 0 {
      inner.buf.push(0xFF);
      inner.payload_start = inner.buf.len();
    } else {
      inner.buf.truncate(inner.payload_start);
    }
    inner.buf.extend_from_slice(bytes);
  }

  /// The payload bytes. Before the first payload write, this is empty.
  pub fn payload(&self) -> Vec<u8> {
    let inner = self.inner.borrow();
    if inner.payload_start == 0 {
      Vec::new()
    } else {
      inner.buf[inner.payload_start..].to_vec()
    }
  }

  /// Serialize to wire bytes.
  ///
  /// Fails with `InvalidArgument` if the payload marker was written but
  /// no payload bytes followed -- a marker with nothing after it is
  /// malformed and must never be sent.
  pub fn encode(&self) -> Result<Vec<u8>, Error> {
    let inner = self.inner.borrow();
    if inner.payload_start != 0 && inner.payload_start == inner.buf.len() {
      return Err(Error::InvalidArgument);
    }
    Ok(inner.buf.clone())
  }

  /// Parse a packet from wire bytes, validating every invariant in
  /// §4.1: version, token length, option ordering/overrun, and the
  /// payload marker.
  pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
    if bytes.len() < 4 {
      return Err(Error::Truncated);
    }

    let ver = bytes[0] >> 6;
    if ver != 1 {
      return Err(Error::Unsupported);
    }

    let tkl = (bytes[0] & 0b1111) as usize;
    if tkl > 8 {
      return Err(Error::InvalidArgument);
    }

    if bytes.len() < 4 + tkl {
      return Err(Error::Truncated);
    }

    let mut cur = coap_common::Cursor::new(&bytes[4 + tkl..]);
    let mut current = 0u32;
    let mut payload_start = 0usize;
    let mut saw_option = false;

    loop {
      if cur.until_end().is_empty() {
        break;
      }

      match read_opt_head(&mut cur) {
        | Ok(OptHead::PayloadMarker) => {
          if cur.until_end().is_empty() {
            return Err(Error::InvalidArgument);
          }
          payload_start = 4 + tkl + cur.position();
          break;
        },
        | Ok(OptHead::Opt(delta, len)) => {
          current += delta.0 as u32;
          if current > 65535 {
            return Err(Error::InvalidArgument);
          }
          if cur.take_exact(len).is_none() {
            return Err(Error::Truncated);
          }
          saw_option = true;
        },
        | Err(e) => return Err(e),
      }
    }

    Ok(Self { inner: Rc::new(RefCell::new(Inner { buf: bytes.to_vec(),
                                                   payload_start,
                                                   last_option: saw_option.then_some(current as u16) })) })
  }

  /// Build the empty-code RST that answers a CoAP ping (a Confirmable
  /// message with the Empty code and no token).
  pub fn reset_for(ping: &Packet) -> Packet {
    let p = Packet::new();
    p.set_type(Type::Reset);
    p.set_code(Code::EMPTY);
    p.set_id(ping.id());
    p
  }

  /// Build the ACK (optionally piggy-backing a response code/payload)
  /// that answers a Confirmable request.
  pub fn ack_for(req: &Packet) -> Packet {
    let p = Packet::new();
    p.set_type(Type::Ack);
    p.set_id(req.id());
    p.set_token(req.token().as_bytes()).expect("request token already validated to be <= 8 bytes");
    p
  }

  /// Is this packet length-wise exactly the 4-byte header with no token,
  /// options, or payload, and the Empty code? Used to recognise a CoAP
  /// ping.
  pub fn is_ping(&self) -> bool {
    let inner = self.inner.borrow();
    self.ty() == Type::Con && self.code() == Code::EMPTY && self.tkl() == 0 && inner.buf.len() == 4
  }
}

/// A non-owning reference to a [`Packet`].
///
/// The outgoing queue and the pending-reply table both hold these rather
/// than an owning `Packet`, so that cancelling a send (dropping the
/// owning handle) is enough to free the buffer even while other tables
/// still have a weak pointer into it.
#[derive(Debug, Clone)]
pub struct WeakPacket {
  inner: Weak<RefCell<Inner>>,
}

impl WeakPacket {
  /// Recover a strong [`Packet`] handle, if the buffer has not already
  /// been freed.
  pub fn upgrade(&self) -> Option<Packet> {
    self.inner.upgrade().map(|inner| Packet { inner })
  }

  /// Whether this weak reference still points at a live packet.
  pub fn is_live(&self) -> bool {
    self.inner.strong_count() > 0
  }
}

impl PartialEq for WeakPacket {
  fn eq(&self, other: &Self) -> bool {
    Weak::ptr_eq(&self.inner, &other.inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_pdu_parse() {
    let bytes = [0x40, 0x01, 0x00, 0x00];
    let p = Packet::decode(&bytes).unwrap();
    assert_eq!(p.version(), Version(1));
    assert_eq!(p.ty(), Type::Con);
    assert_eq!(p.code(), Code::GET);
    assert_eq!(p.id(), Id(0));
    assert_eq!(p.token().as_bytes(), &[] as &[u8]);
  }

  #[test]
  fn full_parse() {
    let mut bytes = vec![0x55, 0xA5, 0x12, 0x34];
    bytes.extend_from_slice(b"token");
    bytes.push(0xC1); // Content-Format option: delta nibble 12, length nibble 1
    bytes.push(0x00);
    bytes.push(0xFF);
    bytes.extend_from_slice(b"payload\0");

    let p = Packet::decode(&bytes).unwrap();
    assert_eq!(p.version(), Version(1));
    assert_eq!(p.ty(), Type::Non);
    assert_eq!(u8::from(p.code()), 0xA5);
    assert_eq!(p.id(), Id(0x1234));
    assert_eq!(p.token().as_bytes(), b"token");
    assert_eq!(p.options(), vec![(12, vec![0x00])]);
    assert_eq!(p.payload(), b"payload\0".to_vec());
  }

  #[test]
  fn illegal_token_length() {
    let bytes = [0x59, 0x01, 0x00, 0x00, 1, 2, 3, 4, 5];
    assert_eq!(Packet::decode(&bytes), Err(Error::InvalidArgument));

    let bytes = [0x5F, 0x01, 0x00, 0x00];
    assert_eq!(Packet::decode(&bytes), Err(Error::InvalidArgument));
  }

  #[test]
  fn options_overrun() {
    let mut bytes = vec![0x55, 0x73, 0x12, 0x34];
    bytes.extend_from_slice(b"token");
    bytes.push(0x00);
    bytes.push(0xC1);
    bytes.push(0x00);
    bytes.push(0xAE);
    bytes.push(0xF0);
    bytes.push(0x03);
    assert!(Packet::decode(&bytes).is_err());
  }

  #[test]
  fn add_option_ordering() {
    let p = Packet::new();
    p.add_option(1, b"a").unwrap();
    p.add_option(1, b"b").unwrap();
    p.add_option(5, b"c").unwrap();
    assert_eq!(p.add_option(3, b"d"), Err(Error::OutOfOrder));
    assert_eq!(p.options(), vec![(1, b"a".to_vec()), (1, b"b".to_vec()), (5, b"c".to_vec())]);
  }

  #[test]
  fn payload_boundary() {
    let p = Packet::new();
    assert_eq!(p.payload(), Vec::<u8>::new());
    p.add_option(1, b"x").unwrap();
    p.append_payload(b"hi");
    assert_eq!(p.add_option(2, b"y"), Err(Error::InvalidArgument));
    assert_eq!(p.payload(), b"hi".to_vec());
  }

  #[test]
  fn round_trip() {
    let p = Packet::new();
    p.set_type(Type::Con);
    p.set_code(Code::GET);
    p.set_id(Id(42));
    p.set_token(b"tok").unwrap();
    p.add_option(11, b"a").unwrap();
    p.add_option(11, b"b").unwrap();
    p.append_payload(b"body");

    let bytes = p.encode().unwrap();
    let decoded = Packet::decode(&bytes).unwrap();

    assert_eq!(decoded.ty(), Type::Con);
    assert_eq!(decoded.code(), Code::GET);
    assert_eq!(decoded.id(), Id(42));
    assert_eq!(decoded.token().as_bytes(), b"tok");
    assert_eq!(decoded.options(), vec![(11, b"a".to_vec()), (11, b"b".to_vec())]);
    assert_eq!(decoded.payload(), b"body".to_vec());
    assert_eq!(decoded.encode().unwrap(), bytes);
  }

  #[test]
  fn marker_with_no_payload_rejected() {
    let p = Packet::new();
    p.append_payload(b"");
    assert_eq!(p.encode(), Err(Error::InvalidArgument));
  }

  #[test]
  fn ping_pong() {
    let ping = Packet::new();
    ping.set_type(Type::Con);
    ping.set_code(Code::EMPTY);
    ping.set_id(Id(7));
    assert!(ping.is_ping());

    let rst = Packet::reset_for(&ping);
    assert_eq!(rst.ty(), Type::Reset);
    assert_eq!(rst.id(), Id(7));
  }

  #[test]
  fn weak_packet_freed_when_dropped() {
    let p = Packet::new();
    let weak = p.downgrade();
    assert!(weak.is_live());
    drop(p);
    assert!(!weak.is_live());
  }
}
