/// Error kinds surfaced anywhere in the `coap-*` stack.
///
/// The packet codec, the transport engine, and the OIC client all speak
/// this single vocabulary rather than layering a new enum per crate,
/// mirroring how `toad_msg`'s parse errors and `toad`'s `platform::Error`
/// both ultimately describe "what went wrong with this exchange" to a
/// caller that usually just wants to log and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
  /// A caller-supplied argument was malformed: a null/empty value where one
  /// was required, a token longer than 8 bytes, and so on.
  InvalidArgument,
  /// A fixed-capacity buffer, queue, or table has no room left.
  OutOfMemory,
  /// An option was appended with a code smaller than the largest already
  /// present, violating the non-decreasing option-code invariant.
  OutOfOrder,
  /// The wire form was cut short: a header, option, or payload ran past
  /// the end of the available bytes.
  Truncated,
  /// A lookup by option code found no matching option.
  NoSuchOption,
  /// A lookup by path found no matching resource.
  NoSuchResource,
  /// An entry with the same identity was already registered (e.g. the same
  /// resource pointer registered twice).
  AlreadyExists,
  /// The queue, socket, or table is at capacity or not ready; try again
  /// later.
  Busy,
  /// The operation was explicitly cancelled by the caller.
  Cancelled,
  /// The operation's deadline elapsed with no reply.
  Timeout,
  /// The retransmission ceiling was reached; this is terminal for the
  /// outgoing entry and is surfaced to the reply callback as a final
  /// invocation carrying no packet.
  PermanentFailure,
  /// The CoAP version was not 1, or another protocol feature this build
  /// does not implement was requested.
  Unsupported,
}

impl core::fmt::Display for Error {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let s = match self {
      | Error::InvalidArgument => "invalid argument",
      | Error::OutOfMemory => "out of memory",
      | Error::OutOfOrder => "option inserted out of order",
      | Error::Truncated => "packet truncated",
      | Error::NoSuchOption => "no such option",
      | Error::NoSuchResource => "no such resource",
      | Error::AlreadyExists => "already exists",
      | Error::Busy => "busy",
      | Error::Cancelled => "cancelled",
      | Error::Timeout => "timed out",
      | Error::PermanentFailure => "permanent failure",
      | Error::Unsupported => "unsupported",
    };
    f.write_str(s)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
