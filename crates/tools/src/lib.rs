//! Built-in tool implementations for Qogito.
//!
//! Every tool operates inside a workspace root: paths are validated by
//! `qogito-security` before any I/O. Read-only tools are offered in passive
//! mode; active mode adds file mutation and an approval-gated shell.

pub mod definitions;
pub mod executor;
pub mod file_read;
pub mod file_write;
pub mod search;
pub mod shell;

pub use definitions::{active_tools, passive_tools, tools_for_mode};
pub use executor::SandboxExecutor;
