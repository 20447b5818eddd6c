//! Security module for Qogito: filesystem sandboxing.
//!
//! Every path a tool touches is resolved against the workspace root and must
//! stay inside it. Resolution is purely lexical so a rejected path never
//! causes I/O.

pub mod path;

pub use path::{PathValidationError, normalize, resolve_in_workspace};
