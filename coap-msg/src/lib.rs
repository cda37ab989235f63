//! CoAP wire format: the fixed header, the delta-compressed option
//! sequence, and the `Packet` object that owns a message's bytes and
//! exposes structured accessors over them.
//!
//! A [`Packet`] is a cheap, clonable handle (`Rc<RefCell<Vec<u8>>>` under
//! the hood) onto the raw wire bytes of one CoAP message -- there is no
//! separate in-memory struct that gets serialized; reading and writing
//! fields reads and writes the buffer directly. This lets a request and
//! its eventual response share ownership of the same underlying bytes
//! across the places that need to see them (the outgoing queue, the
//! pending-reply table, a resource handler) without a deep copy at each
//! handoff.
//!
//! ```text
//! | ver | type | tkl |    code   |      message id     |
//! |-----|------|-----|-----------|----------------------
//! |  1  |  2   |  4  |  3  |  5  |          16          |
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

/// Header primitives: version, type, code, message id, token.
pub mod wire;

/// The delta-compressed option codec.
pub mod opt;

/// The `Packet` object and its weak handle.
pub mod packet;

#[doc(inline)]
pub use opt::{Opt, OptDelta, OptHead, OptNumber};
#[doc(inline)]
pub use packet::{Packet, WeakPacket};
#[doc(inline)]
pub use wire::{Code, CodeKind, Id, Token, Type, Version};
