//! Storage layer for mecal.
//!
//! This module provides SQLite-based persistence for:
//! - Sync queue (offline operations)
//! - Local cache (last-known projects and memory selections)

mod cache;
mod database;
mod migrations;

pub use cache::{CachedMemory, LocalCache};
pub use database::Database;
