//! Access-control device integration

pub mod client;
pub mod types;

pub use client::{DeviceClient, DeviceError, DeviceFetch, ACS_EVENT_PATH};
pub use types::{AcsEventCond, AcsEventRecord, AcsEventResponse, DeviceTarget};
