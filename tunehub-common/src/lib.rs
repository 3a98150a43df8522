//! # TuneHub Common Library
//!
//! Shared code for TuneHub services:
//! - Error type used across crates
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Root folder resolution and initialization

pub mod config;
pub mod error;

pub use error::{Error, Result};
