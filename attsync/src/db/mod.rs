//! Database access for the sync service
//!
//! Schema creation lives in `attsync_common::db`; these modules hold the
//! queries each part of the service runs.

pub mod checkins;
pub mod devices;
pub mod employees;
pub mod runs;
pub mod shift_types;
