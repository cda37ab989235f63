//! The path -> handler table a [`Server`](super::Server) dispatches
//! requests against.

#[cfg(feature = "alloc")]
use std_alloc::boxed::Box;
#[cfg(feature = "alloc")]
use std_alloc::collections::BTreeMap;
#[cfg(feature = "alloc")]
use std_alloc::string::{String, ToString};
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use crate::req::Req;
use crate::resp::Resp;

/// A request handler: given an inbound request, produce a response.
pub type HandlerFn = Box<dyn Fn(&Req) -> Resp>;

/// A single mounted resource.
pub struct Resource {
  handler: HandlerFn,
  observable: bool,
  /// Whether this resource is enumerated by `/well-known/core`.
  visible: bool,
  resource_type: Option<String>,
  interface: Option<String>,
}

impl core::fmt::Debug for Resource {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Resource")
     .field("observable", &self.observable)
     .field("visible", &self.visible)
     .field("resource_type", &self.resource_type)
     .field("interface", &self.interface)
     .finish()
  }
}

/// Table of mounted resources, keyed by Uri-Path.
///
/// Routing is a plain string lookup: no wildcard segments, no regex. A
/// CoAP server's resource tree is small and known ahead of time, so the
/// teacher's generic path-matching combinators aren't needed here.
#[derive(Debug, Default)]
pub struct ResourceTable {
  resources: BTreeMap<String, Resource>,
}

impl ResourceTable {
  /// Create an empty resource table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Mount a handler at `path`, visible in `/well-known/core` discovery.
  /// `observable` controls whether clients may register an Observe
  /// relationship with this resource.
  pub fn mount(&mut self, path: impl Into<String>, observable: bool, handler: HandlerFn) {
    self.resources.insert(path.into(),
                          Resource { handler,
                                    observable,
                                    visible: true,
                                    resource_type: None,
                                    interface: None });
  }

  /// Hide a mounted resource from `/well-known/core` discovery without
  /// unmounting it.
  pub fn hide(&mut self, path: &str) {
    if let Some(r) = self.resources.get_mut(path) {
      r.visible = false;
    }
  }

  /// Attach a `rt`/`if` discovery attribute pair to an already-mounted
  /// resource, used when answering `/.well-known/core`.
  pub fn describe(&mut self, path: &str, resource_type: Option<&str>, interface: Option<&str>) {
    if let Some(r) = self.resources.get_mut(path) {
      r.resource_type = resource_type.map(ToString::to_string);
      r.interface = interface.map(ToString::to_string);
    }
  }

  /// Remove a mounted resource.
  pub fn unmount(&mut self, path: &str) -> bool {
    self.resources.remove(path).is_some()
  }

  /// Look up the handler mounted at `path`.
  pub fn handler(&self, path: &str) -> Option<&HandlerFn> {
    self.resources.get(path).map(|r| &r.handler)
  }

  /// Is the resource at `path` mounted, and is it observable?
  pub fn is_observable(&self, path: &str) -> bool {
    self.resources.get(path).map(|r| r.observable).unwrap_or(false)
  }

  /// Does a resource exist at `path`?
  pub fn contains(&self, path: &str) -> bool {
    self.resources.contains_key(path)
  }

  /// Render the `/well-known/core` payload: one `<path>;rt="...";if="..."`
  /// link per visible resource, separated by commas (RFC 6690).
  pub fn well_known_core(&self) -> Vec<u8> {
    let mut out = String::new();
    let mut first = true;
    for (path, res) in self.resources.iter() {
      if !res.visible {
        continue;
      }
      if !first {
        out.push(',');
      }
      first = false;

      out.push('<');
      out.push_str(path);
      out.push('>');
      if let Some(rt) = &res.resource_type {
        out.push_str(";rt=\"");
        out.push_str(rt);
        out.push('"');
      }
      if let Some(ifc) = &res.interface {
        out.push_str(";if=\"");
        out.push_str(ifc);
        out.push('"');
      }
    }
    out.into_bytes()
  }
}

#[cfg(test)]
mod tests {
  use coap_msg::Code;

  use super::*;
  use crate::resp::code;

  fn ok_handler() -> HandlerFn {
    Box::new(|req| {
      let mut resp = Resp::for_request(req).unwrap();
      resp.set_code(code::CONTENT);
      resp
    })
  }

  #[test]
  fn mount_and_lookup() {
    let mut table = ResourceTable::new();
    table.mount("hello", false, ok_handler());

    assert!(table.contains("hello"));
    assert!(!table.is_observable("hello"));
    assert!(table.handler("nope").is_none());

    let req = Req::get("hello");
    let resp = (table.handler("hello").unwrap())(&req);
    assert_eq!(resp.code(), Code::new(2, 5));
  }

  #[test]
  fn well_known_core_lists_attributes() {
    let mut table = ResourceTable::new();
    table.mount("temp", true, ok_handler());
    table.describe("temp", Some("oic.r.temperature"), Some("sensor"));

    let body = std_alloc::string::String::from_utf8(table.well_known_core()).unwrap();
    assert_eq!(body, "<temp>;rt=\"oic.r.temperature\";if=\"sensor\"");
  }

  #[test]
  fn well_known_core_lists_paths_only_when_undescribed() {
    let mut table = ResourceTable::new();
    table.mount("a", false, ok_handler());
    table.mount("b/c", false, ok_handler());

    let body = std_alloc::string::String::from_utf8(table.well_known_core()).unwrap();
    assert_eq!(body, "<a>,<b/c>");
  }

  #[test]
  fn hidden_resource_is_excluded_from_discovery() {
    let mut table = ResourceTable::new();
    table.mount("a", false, ok_handler());
    table.hide("a");

    assert!(table.well_known_core().is_empty());
  }

  #[test]
  fn unmount_removes_resource() {
    let mut table = ResourceTable::new();
    table.mount("a", false, ok_handler());
    assert!(table.unmount("a"));
    assert!(!table.contains("a"));
    assert!(!table.unmount("a"));
  }
}
