//! # coughlab Common Library
//!
//! Shared code for the coughlab services:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Timestamp helpers (recording stamps, display timestamps)
//! - Static disease reference table

pub mod config;
pub mod disease;
pub mod error;
pub mod time;

pub use disease::{DiseaseRecord, DiseaseTable, Severity};
pub use error::{Error, Result};
