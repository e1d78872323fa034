//! nbcs Common - Shared configuration, validation and logging for nbcs services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Logging setup
//! - Character-aware string helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    AiDefaultsConfig, Config, DiscordConfig, ObservabilityConfig, PresentationConfig,
    StorageConfig, StreamPreview,
};
pub use validation::{Validate, ValidationError, ValidationResult};
