//! Configuration management for mecal.
//!
//! This module handles loading and saving configuration from `~/.mecal/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{AuthConfig, BackendConfig, ColorSetting, Config, GeneralConfig, SyncConfig};
