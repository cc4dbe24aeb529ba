//! Debug session orchestrator for Go programs.
//!
//! A [`Debugger`] owns at most one session against a headless Delve backend,
//! started by launching a binary, attaching to a process, connecting to a
//! running server, or compiling a source/test file first. Every operation
//! returns a serializable response carrying a [`DebugContext`] that tells the
//! caller where the program is and what it can do next.

mod breakpoints;
pub mod compile;
pub mod config;
mod control;
mod debugger;
pub mod error;
pub mod model;
pub mod output;
pub mod projector;
mod session;
pub mod variables;

pub use config::DebuggerConfig;
pub use debugger::Debugger;
pub use error::{DebugError, Result};
pub use model::*;
pub use session::Target;
