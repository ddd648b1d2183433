// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

use shared_models::error::AppError;

use doctor_cell::models::{DoctorListing, UserRecord};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_type: VisitType,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    // Present exactly when visit_type is Online; never serialized as null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_online(&self) -> bool {
        self.visit_type == VisitType::Online
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VisitType {
    #[serde(rename = "in-person", alias = "inperson")]
    InPerson,

    #[serde(rename = "online")]
    Online,
}

impl Default for VisitType {
    fn default() -> Self {
        VisitType::Online
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitType::InPerson => write!(f, "in-person"),
            VisitType::Online => write!(f, "online"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    #[serde(default)]
    pub visit_type: VisitType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub visit_type: Option<VisitType>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ==============================================================================
// VIEW MODELS
// ==============================================================================

/// Patient-facing identity subset of a directory record. Role and credentials
/// stay out of appointment payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<String>,
}

impl PatientSummary {
    pub fn from_user(user: UserRecord) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            avatar: user.avatar,
            gender: user.gender,
        }
    }
}

/// An appointment as a patient sees it: their booking plus the doctor card.
/// A doctor the directory no longer knows renders as null rather than
/// failing the whole listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<DoctorListing>,
}

/// An appointment as a doctor sees it: the booking plus patient identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<PatientSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AppointmentListing {
    Patient(Vec<PatientAppointmentView>),
    Doctor(Vec<DoctorAppointmentView>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAppointmentResponse {
    pub room_code: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Cannot modify an appointment scheduled in the past")]
    PastSchedule,

    #[error("Appointment is not an online visit")]
    NotOnline,

    #[error("No room code assigned to this appointment")]
    RoomCodeMissing,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => {
                AppError::NotFound("Appointment not found".to_string())
            }
            AppointmentError::DoctorNotFound => {
                AppError::NotFound("Doctor not found".to_string())
            }
            AppointmentError::Unauthorized => {
                AppError::Forbidden("Unauthorized access to appointment".to_string())
            }
            AppointmentError::PastSchedule => {
                AppError::InvalidState(
                    "Cannot modify an appointment scheduled in the past".to_string(),
                )
            }
            AppointmentError::NotOnline => {
                AppError::InvalidState("Appointment is not an online visit".to_string())
            }
            AppointmentError::RoomCodeMissing => {
                AppError::InvalidState("No room code assigned to this appointment".to_string())
            }
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::InvalidState(format!(
                    "Appointment cannot be modified in current status: {}",
                    status
                ))
            }
            AppointmentError::ValidationError(message) => AppError::BadRequest(message),
            AppointmentError::DatabaseError(message) => AppError::Database(message),
        }
    }
}
