use std::sync::Arc;

use axum::extract::{Extension, State};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;

use crate::models::{CityDoctors, DashboardSummary, DoctorListing};
use crate::services::directory::DirectoryService;

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctors(
    State(state): State<Arc<AppConfig>>,
) -> Result<ApiResponse<Vec<DoctorListing>>, AppError> {
    let directory = DirectoryService::new(&state);

    let doctors = directory.list_doctors(None).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(ApiResponse::ok(doctors, "Doctors fetched successfully"))
}

// ==============================================================================
// PROTECTED HANDLERS (AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctors_by_city(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<CityDoctors>, AppError> {
    let token = auth.token();
    let caller_id = user.uuid()?;

    let directory = DirectoryService::new(&state);

    let city_doctors = directory.list_doctors_in_city(caller_id, Some(token)).await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("User city information not found".to_string()))?;

    Ok(ApiResponse::ok(city_doctors, "Doctors fetched successfully"))
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<ApiResponse<DashboardSummary>, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(
            "Access denied. Only doctors can access this route.".to_string(),
        ));
    }

    let token = auth.token();
    let doctor_id = user.uuid()?;

    let directory = DirectoryService::new(&state);

    let summary = directory.dashboard_summary(doctor_id, Some(token)).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(ApiResponse::ok(summary, "Dashboard fetched successfully"))
}
