//! Built-in tools.
//!
//! ## Available Tools
//!
//! ### Arithmetic
//! - **calculate**: evaluate `+ - * / **` expressions with parentheses
//!
//! ### Files (confined to the configured base directory)
//! - **write_file**: write text, replacing existing content
//! - **append_file**: append text
//! - **read_file**: read text
//! - **delete_file**: delete a file
//!
//! ### Telephony (registered only when telephony is enabled)
//! - **send_message**: send an SMS or MMS
//! - **make_call**: place a voice call
//!
//! ## Direct Tool Access
//!
//! ```rust,ignore
//! use toolgate::tools::builtins::{CalculateTool, CalculateArgs};
//!
//! let out = CalculateTool::new().execute(CalculateArgs { expression: "2 ** 10".into() })?;
//! assert_eq!(out.formatted, "1024");
//! ```

mod calculate;
mod file_io;
mod messaging;
mod voice;

pub use calculate::{
    evaluate, format_number, CalculateArgs, CalculateOutput, CalculateTool,
    MAX_EXPRESSION_LENGTH, MAX_NESTING_DEPTH,
};
pub use file_io::{
    FileDeleteOutput, FileIoTool, FileOperation, FileReadOutput, FileWriteOutput, PathArgs,
    WriteArgs, MAX_CONTENT_LENGTH,
};
pub use messaging::{build_message, MessagingTool, SendMessageArgs, MAX_BODY_LENGTH};
pub use voice::{call_instructions, say_twiml, MakeCallArgs, VoiceTool, MAX_MESSAGE_LENGTH};

#[cfg(test)]
pub(crate) use messaging::tests::RecordingMessenger;
#[cfg(test)]
pub(crate) use voice::tests::RecordingDialer;

/// Names of the tools that need telephony credentials.
pub const TELEPHONY_TOOL_NAMES: [&str; 2] = [MessagingTool::NAME, VoiceTool::NAME];
