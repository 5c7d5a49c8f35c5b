//! droidsign core - configuration and shared types
//!
//! This crate owns the settings every signing operation is driven by:
//! tool locations, keystore credentials, output and logging preferences.
//! The [`config::ConfigStore`] is constructed once at startup and handed to
//! whoever needs it.

pub mod config;
pub mod error;

pub use config::{Config, ConfigStore, Credentials};
pub use error::{ConfigError, Result};
