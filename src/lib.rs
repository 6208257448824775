//! mecal - engineering memory tracker
//!
//! This crate provides a command-line client for projects and the typed
//! memory documents attached to them, stored in a PostgREST-style backend.
//! Memory changes go through a local `SQLite` queue so they can be replayed
//! after a dropped connection.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod output;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::MecalError;
