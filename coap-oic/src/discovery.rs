//! Non-confirmable multicast `GET /oc/core` discovery, with optional
//! `rt=`/`if=` filters, and a repeating discovery window: a CoAP
//! Non-confirmable request has no ACK to wait for, so the request's
//! own pending-reply timeout stands in for "the window has closed".

#[cfg(feature = "alloc")]
use std_alloc::string::String;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use coap_core::req::Req;
use coap_msg::Token;
use no_std_net::SocketAddr;

const URI_QUERY: u16 = 15;
const ACCEPT: u16 = 17;
const APPLICATION_JSON: u16 = 50;

const DISCOVERY_PATH: &str = "oc/core";

/// A resource found by discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
  /// Who answered.
  pub peer: SocketAddr,
  /// The resource's path, relative to its host.
  pub href: String,
  /// `rt` values advertised for this resource.
  pub resource_types: Vec<String>,
  /// `if` values advertised for this resource.
  pub interfaces: Vec<String>,
  /// Whether the resource supports Observe.
  pub observable: bool,
}

/// Optional `rt=`/`if=` narrowing applied to a discovery request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilter {
  /// Only discover resources advertising this `rt` value.
  pub resource_type: Option<String>,
  /// Only discover resources advertising this `if` value.
  pub interface: Option<String>,
}

/// A single `/oc/core` discovery exchange: one multicast request,
/// answered by however many resources match, over however many
/// windows the caller chooses to keep open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery;

impl Discovery {
  /// Build the Non-confirmable multicast request for `filter`. Send
  /// this to one of
  /// [`coap_core::net::multicast`]'s all-CoAP-devices addresses.
  pub fn request(filter: &DiscoveryFilter) -> Req {
    let mut req = Req::get(DISCOVERY_PATH);
    req.non();

    if let Some(rt) = &filter.resource_type {
      let mut q = String::from("rt=");
      q.push_str(rt);
      req.packet()
         .add_option(URI_QUERY, q.as_bytes())
         .expect("a fresh GET accepts a trailing Uri-Query option");
    }
    if let Some(ifc) = &filter.interface {
      let mut q = String::from("if=");
      q.push_str(ifc);
      req.packet()
         .add_option(URI_QUERY, q.as_bytes())
         .expect("Uri-Query is repeatable and options were appended in order");
    }

    req.packet()
       .add_option(ACCEPT, &APPLICATION_JSON.to_be_bytes())
       .expect("Accept sorts after Uri-Query");

    req
  }

  /// Parse one discovery response. A single datagram may describe
  /// several resources hosted by the same peer.
  pub fn parse_response(peer: SocketAddr, payload: &[u8]) -> Result<Vec<Resource>, coap_common::Error> {
    #[derive(serde::Deserialize)]
    struct Rep {
      href: String,
      #[serde(default, rename = "rt")]
      resource_types: Vec<String>,
      #[serde(default, rename = "if")]
      interfaces: Vec<String>,
      #[serde(default)]
      obs: bool,
    }
    #[derive(serde::Deserialize)]
    struct Envelope {
      oc: Vec<Rep>,
    }

    let envelope: Envelope =
      serde_json::from_slice(payload).map_err(|_| coap_common::Error::InvalidArgument)?;

    Ok(envelope.oc
               .into_iter()
               .map(|r| Resource { peer,
                                   href: r.href,
                                   resource_types: r.resource_types,
                                   interfaces: r.interfaces,
                                   observable: r.obs })
               .collect())
  }
}

/// One discovery window that reopens itself: the window is the
/// request's own pending-reply entry, and its close is the entry's
/// global timeout firing with no further answers. Per §4.7, closing a
/// window is a terminal callback invocation with a null resource; if
/// the caller's callback says to keep looking, another window opens —
/// in this crate's poll-driven API that's simply calling
/// [`DiscoverySession::open`] again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySession {
  filter: DiscoveryFilter,
  token: Option<Token>,
}

impl DiscoverySession {
  /// Start a session that will discover resources matching `filter`.
  /// No window is open yet; call [`DiscoverySession::open`] to send the
  /// first request.
  pub fn new(filter: DiscoveryFilter) -> Self {
    Self { filter, token: None }
  }

  /// Open (or reopen) this session's discovery window: build a fresh
  /// multicast request and remember its token so a later
  /// [`DiscoverySession::window_closed`] call can recognize this
  /// window's timeout.
  pub fn open(&mut self) -> Req {
    let req = Discovery::request(&self.filter);
    self.token = Some(req.packet().token());
    req
  }

  /// Is `expired_token` (as surfaced by [`coap_core::server::Server::tick`]'s
  /// expired-entry list) this session's currently open window? If so the
  /// window has closed with no further replies: invoke the
  /// resource-discovered callback once with a null resource, then call
  /// [`DiscoverySession::open`] again iff the caller wants to keep
  /// looking.
  pub fn window_closed(&self, expired_token: &Token) -> bool {
    self.token.as_ref() == Some(expired_token)
  }
}

#[cfg(test)]
mod tests {
  use std_alloc::string::ToString;

  use super::*;

  fn addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5683))
  }

  #[test]
  fn request_is_non_confirmable_get_with_filters() {
    let filter = DiscoveryFilter { resource_type: Some("oic.r.temperature".to_string()),
                                   interface: None };
    let req = Discovery::request(&filter);

    assert_eq!(req.msg_type(), coap_msg::Type::Non);
    assert_eq!(req.method(), coap_core::req::Method::GET);
    assert_eq!(req.path().unwrap(), "oc/core");
  }

  #[test]
  fn parses_multiple_resources_from_one_response() {
    let payload = br#"{"oc":[
      {"href":"/a/light","rt":["oic.r.light"],"if":["oic.if.rw"],"obs":true},
      {"href":"/a/temp","rt":["oic.r.temperature"],"if":["oic.if.r"]}
    ]}"#;

    let found = Discovery::parse_response(addr(), payload).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].href, "/a/light");
    assert!(found[0].observable);
    assert!(!found[1].observable);
  }

  #[test]
  fn malformed_payload_is_invalid_argument() {
    let err = Discovery::parse_response(addr(), b"not json").unwrap_err();
    assert_eq!(err, coap_common::Error::InvalidArgument);
  }

  #[test]
  fn window_closed_recognizes_its_own_token_only() {
    let mut session = DiscoverySession::new(DiscoveryFilter::default());
    let req = session.open();

    assert!(session.window_closed(&req.packet().token()));
    assert!(!session.window_closed(&Token::new(b"other")));
  }

  #[test]
  fn reopening_tracks_the_new_token() {
    let mut session = DiscoverySession::new(DiscoveryFilter::default());
    let first = session.open();
    let second = session.open();

    assert!(!session.window_closed(&first.packet().token()));
    assert!(session.window_closed(&second.packet().token()));
  }
}
