//! # Attendance Sync Common Library
//!
//! Shared code for the attendance sync service:
//! - Database initialization, schema and models
//! - Configuration loading and root folder resolution
//! - Device time window and timestamp normalization

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::TimeWindow;
