//! HTTP API handlers

pub mod attendance;
pub mod buildinfo;
pub mod checkins;
pub mod devices;
pub mod employees;
pub mod health;
pub mod runs;
pub mod shift_types;

pub use attendance::attendance_routes;
pub use buildinfo::buildinfo_routes;
pub use checkins::checkin_routes;
pub use devices::device_routes;
pub use employees::employee_routes;
pub use health::health_routes;
pub use runs::run_routes;
pub use shift_types::shift_type_routes;
