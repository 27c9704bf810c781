//! API data transfer objects.
//!
//! These types define the API contract shared between the server and
//! clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One alarm as reported by the API.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct AlarmState {
    pub id: String,
    pub hour: u8,
    pub minute: u8,
    pub label: String,
    pub enabled: bool,
    pub vibrate: bool,
    pub sound_file: String,
    /// True iff this alarm currently owns the ringing slot.
    pub ringing: bool,
}

/// Alarm creation request. Optional fields fall back to server defaults.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateAlarmRequest {
    pub hour: u8,
    pub minute: u8,
    pub label: Option<String>,
    pub vibrate: Option<bool>,
    pub sound_file: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateAlarmResponse {
    pub success: bool,
    pub id: String,
}

/// Boolean outcome for delete/toggle/stop.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Current ringing slot, for UI polling.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct RingingState {
    pub ringing: bool,
    pub label: String,
}
