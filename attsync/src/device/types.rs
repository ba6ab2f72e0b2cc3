//! Access-control event search wire types
//!
//! Field names follow the device's ISAPI JSON (`AcsEventCond`, `InfoList`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Search ID sent with every page; the device only uses it to group pages
pub const SEARCH_ID: &str = "1";

/// Connection parameters for one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Host or host:port
    pub device_ip: String,
    /// Event major type filter
    pub major: i64,
    /// Event minor type filter
    pub minor: i64,
    pub device_user: String,
    #[serde(skip_serializing, default)]
    pub device_user_password: String,
}

impl From<&attsync_common::db::Device> for DeviceTarget {
    fn from(device: &attsync_common::db::Device) -> Self {
        Self {
            device_ip: device.device_ip.clone(),
            major: device.major,
            minor: device.minor,
            device_user: device.device_user.clone(),
            device_user_password: device.device_user_password.clone(),
        }
    }
}

/// POST body for one page of the event search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcsEventRequest {
    #[serde(rename = "AcsEventCond")]
    pub cond: AcsEventCond,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcsEventCond {
    #[serde(rename = "searchID")]
    pub search_id: String,
    pub search_result_position: u64,
    pub max_results: u64,
    pub major: i64,
    pub minor: i64,
    pub start_time: String,
    pub end_time: String,
}

/// Event search response; `AcsEvent` is absent when the device has nothing to say
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcsEventResponse {
    #[serde(rename = "AcsEvent")]
    pub acs_event: Option<AcsEventPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcsEventPage {
    #[serde(rename = "searchID", default)]
    pub search_id: Option<String>,
    /// "OK" when complete, "MORE" when further pages exist
    #[serde(default)]
    pub response_status_strg: Option<String>,
    #[serde(default)]
    pub num_of_matches: Option<u64>,
    #[serde(default)]
    pub total_matches: Option<u64>,
    #[serde(rename = "InfoList", default)]
    pub info_list: Option<Vec<AcsEventRecord>>,
}

/// One device event
///
/// Only the fields the sync reads are typed; everything else is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcsEventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_no_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_no: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AcsEventRecord {
    /// Badge identifier, if present and non-blank
    pub fn badge(&self) -> Option<&str> {
        self.employee_no_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_device_field_names() {
        let request = AcsEventRequest {
            cond: AcsEventCond {
                search_id: SEARCH_ID.to_string(),
                search_result_position: 30,
                max_results: 30,
                major: 5,
                minor: 75,
                start_time: "2025-01-07T00:00:00+06:00".to_string(),
                end_time: "2025-01-07T23:59:59+06:00".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        let cond = &json["AcsEventCond"];
        assert_eq!(cond["searchID"], "1");
        assert_eq!(cond["searchResultPosition"], 30);
        assert_eq!(cond["maxResults"], 30);
        assert_eq!(cond["major"], 5);
        assert_eq!(cond["minor"], 75);
        assert_eq!(cond["startTime"], "2025-01-07T00:00:00+06:00");
        assert_eq!(cond["endTime"], "2025-01-07T23:59:59+06:00");
    }

    #[test]
    fn test_response_with_records() {
        let body = r#"{
            "AcsEvent": {
                "searchID": "1",
                "responseStatusStrg": "MORE",
                "numOfMatches": 2,
                "totalMatches": 45,
                "InfoList": [
                    {"major": 5, "minor": 75, "time": "2025-01-07T09:00:00+06:00",
                     "employeeNoString": "1001", "cardReaderNo": 1, "serialNo": 812},
                    {"major": 5, "minor": 21, "time": "2025-01-07T09:01:00+06:00"}
                ]
            }
        }"#;

        let response: AcsEventResponse = serde_json::from_str(body).unwrap();
        let page = response.acs_event.unwrap();
        assert_eq!(page.total_matches, Some(45));
        let records = page.info_list.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].badge(), Some("1001"));
        assert_eq!(records[0].serial_no, Some(812));
        assert_eq!(records[0].extra["cardReaderNo"], 1);
        assert_eq!(records[1].badge(), None);
    }

    #[test]
    fn test_response_without_event_block() {
        let response: AcsEventResponse =
            serde_json::from_str(r#"{"statusCode": 1, "statusString": "OK"}"#).unwrap();
        assert!(response.acs_event.is_none());

        let response: AcsEventResponse =
            serde_json::from_str(r#"{"AcsEvent": {"responseStatusStrg": "NO MATCH"}}"#).unwrap();
        let page = response.acs_event.unwrap();
        assert_eq!(page.total_matches, None);
        assert!(page.info_list.is_none());
    }

    #[test]
    fn test_blank_badge_is_not_usable() {
        let record = AcsEventRecord {
            employee_no_string: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.badge(), None);
    }
}
