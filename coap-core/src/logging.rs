use core::fmt::Write;

use coap_common::Writable;
use tinyvec::ArrayVec;

use crate::util::code_to_human;

pub(crate) fn msg_summary(msg: &coap_msg::Packet) -> Writable<ArrayVec<[u8; 64]>> {
  let mut buf: Writable<ArrayVec<[u8; 64]>> = Default::default();
  write!(buf,
         "{:?}: {:?} {} with {} byte payload",
         msg.code().kind(),
         msg.ty(),
         code_to_human(msg.code()).as_str(),
         msg.payload().len()).ok();
  buf
}
