//! Filesystem confinement for the file tools.
//!
//! A [`SandboxRoot`] is opened once from configuration and shared by all four
//! file tools. [`SandboxRoot::resolve`] turns caller input into a
//! [`ResolvedPath`] or refuses it:
//!
//! ```rust,ignore
//! use toolgate::tools::security::SandboxRoot;
//!
//! let sandbox = SandboxRoot::open("app_io_files", true)?;
//! let target = sandbox.resolve("notes/today.txt")?;   // ok
//! let escape = sandbox.resolve("../etc/passwd");      // PathEscape
//! ```
//!
//! Rejected:
//! - absolute paths and `..` that climbs above the root
//! - symlinks whose target lies outside the root
//! - empty paths and paths naming the root itself

mod path;

pub use path::{ResolvedPath, SandboxRoot};
