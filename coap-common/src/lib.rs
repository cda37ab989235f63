//! Common structs and abstractions shared by the `coap-*` crates.
//!
//! This crate exists so that the wire codec (`coap-msg`), the transport
//! engine (`coap-core`) and the OIC client (`coap-oic`) can stay agnostic
//! over their backing array type: a `std` build uses `Vec`, a
//! constrained build can swap in a `tinyvec::ArrayVec`-backed one
//! without touching call sites.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![allow(clippy::unused_unit)]
#![deny(missing_docs)]

extern crate alloc;

/// Extensions to Result
pub mod result;

/// Function utils
pub mod fns;

/// Cursor over a byte slice
pub mod cursor;
pub use cursor::*;

/// Array abstraction (`Vec` / `tinyvec::ArrayVec`)
pub mod array;
pub use array::*;

/// Heap-allocless byte-buffer hasher
pub mod hash;

/// A writeable byte buffer
pub mod writable;
pub use writable::Writable;

/// Error kinds surfaced by the coap-* crates (packet codec,
/// transport engine, and OIC client all share this taxonomy).
pub mod error;
pub use error::Error;

/// `coap` prelude
pub mod prelude {
  pub use super::array::*;
  pub use super::cursor::*;
  pub use super::error::*;
  pub use super::fns::*;
  pub use super::result::*;
}
