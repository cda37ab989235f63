//! Request construction.

#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_msg::{Packet, Type};

/// Request methods.
pub mod method;

#[doc(inline)]
pub use method::Method;

/// A CoAP request: a thin, method-aware view over a [`Packet`].
///
/// ```
/// use coap_core::req::Req;
///
/// let mut req = Req::post("hello");
/// req.set_payload(b"john");
/// assert_eq!(req.method(), coap_core::req::Method::POST);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Req(Packet);

impl Req {
  /// Create a request with the given method and Uri-Path.
  pub fn new(method: Method, path: impl AsRef<str>) -> Self {
    let packet = Packet::new();
    packet.set_type(Type::Con);
    packet.set_code(method.0);

    for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
      packet.add_option(11, segment.as_bytes())
            .expect("fresh packet accepts non-decreasing Uri-Path options");
    }

    Self(packet)
  }

  /// The request method.
  pub fn method(&self) -> Method {
    Method(self.0.code())
  }

  /// Borrow the underlying packet.
  pub fn packet(&self) -> &Packet {
    &self.0
  }

  /// The Uri-Path segments, joined with `/`.
  pub fn path(&self) -> Result<String, core::str::Utf8Error> {
    let mut out = String::new();
    for (i, seg) in self.0.find_options(11).into_iter().enumerate() {
      if i > 0 {
        out.push('/');
      }
      out.push_str(core::str::from_utf8(&seg)?);
    }
    Ok(out)
  }

  /// The request's message type (CON or NON).
  pub fn msg_type(&self) -> Type {
    self.0.ty()
  }

  /// Mark this request as non-confirmable.
  pub fn non(&mut self) {
    self.0.set_type(Type::Non);
  }

  /// Create a GET request.
  pub fn get(path: impl AsRef<str>) -> Self {
    Self::new(Method::GET, path)
  }

  /// Create a POST request.
  pub fn post(path: impl AsRef<str>) -> Self {
    Self::new(Method::POST, path)
  }

  /// Create a PUT request.
  pub fn put(path: impl AsRef<str>) -> Self {
    Self::new(Method::PUT, path)
  }

  /// Create a DELETE request.
  pub fn delete(path: impl AsRef<str>) -> Self {
    Self::new(Method::DELETE, path)
  }

  /// Set the request payload.
  pub fn set_payload(&mut self, payload: &[u8]) {
    self.0.set_payload(payload);
  }

  /// The payload bytes.
  pub fn payload(&self) -> Vec<u8> {
    self.0.payload()
  }
}

impl From<Packet> for Req {
  fn from(packet: Packet) -> Self {
    Self(packet)
  }
}

impl From<Req> for Packet {
  fn from(req: Req) -> Self {
    req.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_path_options() {
    let req = Req::get("a/b");
    assert_eq!(req.path().unwrap(), "a/b");
    assert_eq!(req.method(), Method::GET);
  }

  #[test]
  fn payload_roundtrip() {
    let mut req = Req::post("hello");
    req.set_payload(b"john");
    assert_eq!(req.payload(), b"john".to_vec());
  }
}
