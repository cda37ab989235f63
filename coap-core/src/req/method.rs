use coap_msg::Code;

/// A request method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Method(pub(super) Code);

impl Method {
  /// `0.01 GET`
  pub const GET: Method = Method(Code::new(0, 1));
  /// `0.02 POST`
  pub const POST: Method = Method(Code::new(0, 2));
  /// `0.03 PUT`
  pub const PUT: Method = Method(Code::new(0, 3));
  /// `0.04 DELETE`
  pub const DELETE: Method = Method(Code::new(0, 4));

  /// Is this request method equal to, or one of, the given method(s)?
  pub fn is_one_of(&self, methods: &[Method]) -> bool {
    methods.contains(self)
  }
}
