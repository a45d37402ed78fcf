// --- File: crates/medpush_common/src/models.rs ---

// Records shared between the storage layer, the notification core and the
// HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A push token registered by one of a doctor's devices.
///
/// Tokens with a `device_id` are unique per `(doctor_id, device_id)`; legacy
/// tokens without one are unique by the token string alone.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub id: i64,
    pub token: String,
    pub doctor_id: i64,
    pub device_id: Option<String>,
    pub device_type: Option<String>,
    pub app_version: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last successful registration; eviction order is based on it.
    pub updated_at: DateTime<Utc>,
}

/// A persisted notification addressed to one doctor.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// The recipient.
    pub doctor_id: i64,
    pub read: bool,
    pub content: String,
    /// Application-defined kind, e.g. "Outcome" or "Other".
    #[serde(rename = "type")]
    pub kind: String,
    pub type_id: Option<i64>,
    pub patient_id: Option<i64>,
    /// The doctor whose action triggered the notification.
    pub type_doctor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a notification that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub doctor_id: i64,
    pub kind: String,
    pub content: String,
    pub type_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub type_doctor_id: Option<i64>,
}

impl NewNotification {
    pub fn new(doctor_id: i64, kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            doctor_id,
            kind: kind.into(),
            content: content.into(),
            type_id: None,
            patient_id: None,
            type_doctor_id: None,
        }
    }

    pub fn with_type_id(mut self, type_id: Option<i64>) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn with_patient(mut self, patient_id: Option<i64>) -> Self {
        self.patient_id = patient_id;
        self
    }

    pub fn with_type_doctor(mut self, type_doctor_id: Option<i64>) -> Self {
        self.type_doctor_id = type_doctor_id;
        self
    }
}

/// Public profile fields of a doctor, owned by the directory.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: i64,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// The patient fields a notification feed shows, owned by the records subsystem.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: i64,
    /// The doctor who owns the record.
    pub doctor_id: Option<i64>,
    pub name: Option<String>,
    pub hospital: Option<String>,
    pub governorate: Option<String>,
    pub submit_status: bool,
    pub outcome_status: bool,
}
