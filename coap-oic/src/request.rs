//! Request/response against a resource that discovery already found.

#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_core::req::{Method, Req};
use coap_msg::Code;
use no_std_net::SocketAddr;

/// A decoded reply to an [`Req`] built by this module.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  /// The response's status code.
  pub code: Code,
  /// Who replied.
  pub peer: SocketAddr,
  /// The `rep` object belonging to the `href` this request targeted.
  pub rep: serde_json::Value,
}

/// Build a request against a previously-discovered resource's `href`.
/// Confirmable by default; pass `confirmable = false` for a fire-and-forget
/// NON request.
pub fn build(method: Method, href: &str, confirmable: bool, payload: Option<&[u8]>) -> Req {
  let mut req = Req::new(method, href);
  if !confirmable {
    req.non();
  }
  if let Some(payload) = payload {
    req.set_payload(payload);
  }
  req
}

/// Parse a response payload shaped as a JSON array of
/// `{"href": "...", "rep": {...}}` objects, one per resource the
/// response is multiplexing, and surface the entry matching `href`.
pub fn parse(code: Code, peer: SocketAddr, href: &str, payload: &[u8]) -> Result<Response, coap_common::Error> {
  #[derive(serde::Deserialize)]
  struct Entry {
    href: String,
    rep: serde_json::Value,
  }

  let entries: Vec<Entry> =
    serde_json::from_slice(payload).map_err(|_| coap_common::Error::InvalidArgument)?;

  entries.into_iter()
         .find(|e| e.href == href)
         .map(|e| Response { code, peer, rep: e.rep })
         .ok_or(coap_common::Error::NoSuchResource)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5683))
  }

  #[test]
  fn builds_confirmable_put_with_payload() {
    let req = build(Method::PUT, "/a/light", true, Some(b"{\"on\":true}"));
    assert_eq!(req.msg_type(), coap_msg::Type::Con);
    assert_eq!(req.method(), Method::PUT);
    assert_eq!(req.payload(), b"{\"on\":true}".to_vec());
  }

  #[test]
  fn parses_matching_href() {
    let payload = br#"[
      {"href":"/a/light","rep":{"on":true}},
      {"href":"/a/temp","rep":{"value":21}}
    ]"#;

    let resp = parse(Code::new(2, 5), addr(), "/a/light", payload).unwrap();
    assert_eq!(resp.rep["on"], serde_json::Value::Bool(true));
  }

  #[test]
  fn missing_href_is_no_such_resource() {
    let payload = br#"[{"href":"/a/temp","rep":{"value":21}}]"#;
    let err = parse(Code::new(2, 5), addr(), "/a/light", payload).unwrap_err();
    assert_eq!(err, coap_common::Error::NoSuchResource);
  }
}
