//! `coap-oic` is the OIC (Open Interconnect) client layer that rides on
//! top of a `coap-core` [`Server`](coap_core::server::Server): resource
//! discovery over multicast, request/response against a discovered
//! resource, and an Observe subscription that falls back to polling
//! when a resource does not advertise observability.
//!
//! This crate never parses an OIC resource's application payload
//! beyond what is needed to dispatch a response to the right
//! `href` — its `rep` object is handed back to the caller as an
//! untyped [`serde_json::Value`].

// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

/// Non-confirmable multicast resource discovery.
pub mod discovery;

/// Request/response against an already-discovered resource.
pub mod request;

/// Observe subscription with a polling fallback.
pub mod observe;

#[doc(inline)]
pub use discovery::{Discovery, DiscoveryFilter, DiscoverySession, Resource};
#[doc(inline)]
pub use observe::Session;
#[doc(inline)]
pub use request::Response;
