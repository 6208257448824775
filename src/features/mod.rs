//! Client-side features built on the handlers.
//!
//! - Sync queue and driver
//! - Memory selection for projects
//! - Shell completions

pub mod selection;
pub mod shell;
pub mod sync;
