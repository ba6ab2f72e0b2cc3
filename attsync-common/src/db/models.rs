//! Database models

use serde::{Deserialize, Serialize};

/// Device Configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_ip: String,
    pub major: i64,
    pub minor: i64,
    pub device_user: String,
    /// Never echoed back through the API
    #[serde(skip_serializing, default)]
    pub device_user_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Primary key, e.g. `EMP-0001`
    pub name: String,
    pub employee_name: String,
    /// Badge identifier reported by access-control devices
    pub attendance_device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeCheckin {
    pub name: String,
    pub employee: String,
    pub employee_name: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    pub device_id: Option<String>,
    pub log_type: Option<String>,
    pub skip_auto_attendance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftType {
    pub name: String,
    pub last_sync_of_checkin: Option<String>,
}
