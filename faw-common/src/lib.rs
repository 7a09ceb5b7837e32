//! # FAW Common Library
//!
//! Shared code for the Facial Affect Watcher:
//! - Common error type
//! - Configuration file resolution and loading
//! - Forced-removal filesystem helpers

pub mod config;
pub mod error;
pub mod fsutil;

pub use error::{Error, Result};
