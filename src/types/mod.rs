//! Core type definitions for toolgate.
//!
//! - [`InvocationId`]: TypeID tagging each tool invocation
//! - [`PhoneNumber`]: validated E.164 number used by the telephony tools

mod invocation_id;
mod phone_number;

pub use invocation_id::{InvalidInvocationId, InvocationId};
pub use phone_number::{InvalidPhoneNumber, PhoneNumber};
