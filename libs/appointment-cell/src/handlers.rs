// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{
    Appointment, AppointmentListing, CreateAppointmentRequest, JoinAppointmentResponse,
    UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentService;

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden(
            "Access denied. Only patients can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let patient_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service.create_appointment(patient_id, request, token).await?;

    Ok(ApiResponse::created(appointment, "Appointment created successfully"))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden(
            "Access denied. Only patients can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let patient_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .update_appointment(appointment_id, patient_id, request, token)
        .await?;

    Ok(ApiResponse::ok(appointment, "Appointment updated successfully"))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden(
            "Access denied. Only patients can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let patient_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .delete_appointment(appointment_id, patient_id, token)
        .await?;

    Ok(ApiResponse::ok(appointment, "Appointment deleted successfully"))
}

// ==============================================================================
// SHARED HANDLERS (PATIENT AND DOCTOR)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<AppointmentListing>, AppError> {
    let token = auth.token();
    let caller_id = user.uuid()?;

    let service = AppointmentService::new(&state);

    // Each role gets its own joined view of the same collection
    let listing = if user.is_patient() {
        AppointmentListing::Patient(service.list_for_patient(caller_id, token).await?)
    } else if user.is_doctor() {
        AppointmentListing::Doctor(service.list_for_doctor(caller_id, token).await?)
    } else {
        return Err(AppError::Forbidden(
            "Access denied. Only patients and doctors can access this route.".to_string(),
        ));
    };

    Ok(ApiResponse::ok(listing, "Appointments fetched successfully"))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let token = auth.token();

    let service = AppointmentService::new(&state);
    let appointment = service.get_appointment(appointment_id, token).await?;

    let is_owner = appointment.patient_id.to_string() == user.id;
    let is_assigned_doctor = appointment.doctor_id.to_string() == user.id;

    if !is_owner && !is_assigned_doctor {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(ApiResponse::ok(appointment, "Appointment fetched successfully"))
}

#[axum::debug_handler]
pub async fn join_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<JoinAppointmentResponse>, AppError> {
    let token = auth.token();
    let caller_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let room = service.join_appointment(appointment_id, caller_id, token).await?;

    Ok(ApiResponse::ok(room, "Room code fetched successfully"))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(
            "Access denied. Only doctors can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let doctor_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .approve_appointment(appointment_id, doctor_id, token)
        .await?;

    Ok(ApiResponse::ok(appointment, "Appointment approved successfully"))
}

#[axum::debug_handler]
pub async fn decline_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(
            "Access denied. Only doctors can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let doctor_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .decline_appointment(appointment_id, doctor_id, token)
        .await?;

    Ok(ApiResponse::ok(appointment, "Appointment declined successfully"))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<Appointment>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(
            "Access denied. Only doctors can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let doctor_id = user.uuid()?;

    let service = AppointmentService::new(&state);
    let appointment = service
        .complete_appointment(appointment_id, doctor_id, token)
        .await?;

    Ok(ApiResponse::ok(appointment, "Appointment completed successfully"))
}
