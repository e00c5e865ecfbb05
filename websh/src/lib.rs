//! websh - Interactive shell for JavaScript programs
//!
//! Every command names a script: `foo a b` loads `foo.js` from the working
//! directory, runs it in a fresh engine context, and calls its
//! `main(["foo", "a", "b"])`.
//!
//! This crate provides:
//! - A value bridge between host values and engine values
//! - Capability objects modeled on the browser filesystem API
//!   (`requestFileSystem`, `DirectoryReader`, `FileReader`) that complete by
//!   calling script callbacks synchronously
//! - Per-command execution sessions and the read-eval command loop

pub mod bridge;
pub mod capability;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host_fs;
pub mod output;
pub mod session;
pub mod shell;

pub use bridge::BridgedValue;
pub use error::{CapabilityError, SessionError, WebshError, WebshResult};
pub use output::Output;
pub use session::{Session, SessionOutcome, SessionState};
pub use shell::{BufReadSource, CommandLine, CommandOutcome, LineSource, ReadLine, Shell, ShellBuilder};
