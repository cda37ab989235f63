//! Response construction.

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::{Code, Packet, Type};

use crate::req::Req;

/// Response codes.
pub mod code;

/// A CoAP response: a thin view over a [`Packet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resp(Packet);

impl Resp {
  /// Build the response that answers `req`: an ACK if `req` is
  /// Confirmable, a NON if `req` is Non-confirmable, or `None` for an
  /// Empty/Reset request (which is not a request at all).
  pub fn for_request(req: &Req) -> Option<Self> {
    match req.msg_type() {
      | Type::Con => Some(Self::ack(req)),
      | Type::Non => Some(Self::non(req)),
      | _ => None,
    }
  }

  /// Build the ACK that piggybacks a response onto a Confirmable request.
  pub fn ack(req: &Req) -> Self {
    let p = Packet::ack_for(req.packet());
    p.set_code(code::CONTENT);
    Self(p)
  }

  /// Build a freestanding Confirmable response (used when a response is
  /// sent separately from the ACK for its request).
  pub fn con(req: &Req) -> Self {
    let p = Packet::new();
    p.set_type(Type::Con);
    p.set_code(code::CONTENT);
    p.set_token(req.packet().token().as_bytes()).ok();
    Self(p)
  }

  /// Build a Non-confirmable response.
  pub fn non(req: &Req) -> Self {
    let p = Packet::new();
    p.set_type(Type::Non);
    p.set_code(code::CONTENT);
    p.set_token(req.packet().token().as_bytes()).ok();
    Self(p)
  }

  /// Borrow the underlying packet.
  pub fn packet(&self) -> &Packet {
    &self.0
  }

  /// The response's message type.
  pub fn msg_type(&self) -> Type {
    self.0.ty()
  }

  /// The response's status code.
  pub fn code(&self) -> Code {
    self.0.code()
  }

  /// Overwrite the status code.
  pub fn set_code(&mut self, code: Code) {
    self.0.set_code(code);
  }

  /// Set the response payload.
  pub fn set_payload(&mut self, payload: &[u8]) {
    self.0.set_payload(payload);
  }

  /// The payload bytes.
  pub fn payload(&self) -> Vec<u8> {
    self.0.payload()
  }
}

impl From<Packet> for Resp {
  fn from(packet: Packet) -> Self {
    Self(packet)
  }
}

impl From<Resp> for Packet {
  fn from(resp: Resp) -> Self {
    resp.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ack_shares_id_and_token() {
    let mut req = Req::get("/hello");
    req.packet().set_token(b"tok").unwrap();

    let resp = Resp::for_request(&req).unwrap();
    assert_eq!(resp.msg_type(), Type::Ack);
    assert_eq!(resp.packet().id(), req.packet().id());
    assert_eq!(resp.packet().token(), req.packet().token());
  }

  #[test]
  fn non_request_gets_non_response() {
    let mut req = Req::get("/hello");
    req.non();

    let resp = Resp::for_request(&req).unwrap();
    assert_eq!(resp.msg_type(), Type::Non);
  }
}
