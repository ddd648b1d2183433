// libs/appointment-cell/src/services/booking.rs
use chrono::{NaiveTime, Utc};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use std::collections::HashMap;
use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::store::StoreClient;
use doctor_cell::services::directory::DirectoryService;
use doctor_cell::models::DoctorListing;

use crate::models::{
    Appointment, AppointmentStatus, AppointmentError, CreateAppointmentRequest,
    UpdateAppointmentRequest, DoctorAppointmentView, PatientAppointmentView,
    PatientSummary, JoinAppointmentResponse, VisitType,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::room;

pub struct AppointmentService {
    store: Arc<StoreClient>,
    directory: DirectoryService,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
            directory: DirectoryService::new(config),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book a new appointment for a patient. Online visits get a room code
    /// at creation; in-person visits never carry one.
    pub async fn create_appointment(
        &self,
        patient_id: Uuid,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Creating {} appointment for patient {} with doctor {}",
            request.visit_type, patient_id, request.doctor_id
        );

        parse_time_of_day(&request.scheduled_time)?;

        // The chosen doctor must exist in the directory with the doctor role
        self.directory
            .find_doctor(request.doctor_id, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let now = Utc::now();
        let mut appointment_data = serde_json::Map::new();
        appointment_data.insert("patientId".to_string(), json!(patient_id));
        appointment_data.insert("doctorId".to_string(), json!(request.doctor_id));
        appointment_data.insert("visitType".to_string(), json!(request.visit_type.to_string()));
        appointment_data.insert("scheduledDate".to_string(), json!(request.scheduled_date));
        appointment_data.insert("scheduledTime".to_string(), json!(request.scheduled_time));
        appointment_data.insert(
            "status".to_string(),
            json!(AppointmentStatus::Pending.to_string()),
        );
        appointment_data.insert("createdAt".to_string(), json!(now.to_rfc3339()));
        appointment_data.insert("updatedAt".to_string(), json!(now.to_rfc3339()));

        if let Some(notes) = &request.notes {
            appointment_data.insert("notes".to_string(), json!(notes));
        }

        if request.visit_type == VisitType::Online {
            appointment_data.insert("roomCode".to_string(), json!(room::default_room_code()));
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.store.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(Value::Object(appointment_data)),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} created successfully", appointment.id);
        Ok(appointment)
    }

    /// Get appointment by ID
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// List a patient's appointments, newest first, with the assigned
    /// doctor's card joined onto each row.
    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<PatientAppointmentView>, AppointmentError> {
        debug!("Listing appointments for patient: {}", patient_id);

        let path = format!(
            "/rest/v1/appointments?patientId=eq.{}&order=scheduledDate.desc,scheduledTime.desc",
            patient_id
        );
        let appointments = self.fetch_appointments(&path, auth_token).await?;

        if appointments.is_empty() {
            return Ok(vec![]);
        }

        let doctor_ids = collect_ids(appointments.iter().map(|a| a.doctor_id));
        let doctors = self.doctor_cards_by_id(&doctor_ids, auth_token).await?;

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let doctor = doctors.get(&appointment.doctor_id).cloned();
                if doctor.is_none() {
                    warn!(
                        "Doctor {} missing from directory for appointment {}",
                        appointment.doctor_id, appointment.id
                    );
                }
                PatientAppointmentView { appointment, doctor }
            })
            .collect())
    }

    /// List a doctor's appointments, newest first, with patient identity
    /// joined onto each row.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DoctorAppointmentView>, AppointmentError> {
        debug!("Listing appointments for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/appointments?doctorId=eq.{}&order=scheduledDate.desc,scheduledTime.desc",
            doctor_id
        );
        let appointments = self.fetch_appointments(&path, auth_token).await?;

        if appointments.is_empty() {
            return Ok(vec![]);
        }

        let patient_ids = collect_ids(appointments.iter().map(|a| a.patient_id));
        let users = self.directory
            .users_by_ids(&patient_ids, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut patients: HashMap<Uuid, PatientSummary> = users
            .into_iter()
            .map(|user| (user.id, PatientSummary::from_user(user)))
            .collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let patient = patients.remove(&appointment.patient_id).or_else(|| {
                    warn!(
                        "Patient {} missing from directory for appointment {}",
                        appointment.patient_id, appointment.id
                    );
                    None
                });
                DoctorAppointmentView { appointment, patient }
            })
            .collect())
    }

    /// Reschedule or amend a pending booking. Only the owning patient can
    /// update, and never into the past.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {} for patient {}", appointment_id, patient_id);

        let current = self.get_owned_appointment(appointment_id, patient_id, auth_token).await?;

        // Validate the merged schedule before anything is written
        let effective_date = request.scheduled_date.unwrap_or(current.scheduled_date);
        let effective_time_raw = request
            .scheduled_time
            .clone()
            .unwrap_or_else(|| current.scheduled_time.clone());
        let effective_time = parse_time_of_day(&effective_time_raw)?;

        let scheduled_at = effective_date.and_time(effective_time).and_utc();
        if scheduled_at <= Utc::now() {
            return Err(AppointmentError::PastSchedule);
        }

        if let Some(new_doctor_id) = request.doctor_id {
            if new_doctor_id != current.doctor_id {
                self.directory
                    .find_doctor(new_doctor_id, Some(auth_token))
                    .await
                    .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
                    .ok_or(AppointmentError::DoctorNotFound)?;
            }
        }

        let mut update_data = serde_json::Map::new();

        if let Some(doctor_id) = request.doctor_id {
            update_data.insert("doctorId".to_string(), json!(doctor_id));
        }
        if let Some(scheduled_date) = request.scheduled_date {
            update_data.insert("scheduledDate".to_string(), json!(scheduled_date));
        }
        if let Some(scheduled_time) = &request.scheduled_time {
            update_data.insert("scheduledTime".to_string(), json!(scheduled_time));
        }
        if let Some(notes) = &request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        // Room codes follow the visit type: switching to online mints one,
        // switching to in-person clears it.
        let effective_type = request
            .visit_type
            .clone()
            .unwrap_or_else(|| current.visit_type.clone());

        if let Some(visit_type) = &request.visit_type {
            update_data.insert("visitType".to_string(), json!(visit_type.to_string()));
        }

        if effective_type != current.visit_type {
            let room_code = match effective_type {
                VisitType::Online => json!(room::default_room_code()),
                VisitType::InPerson => Value::Null,
            };
            update_data.insert("roomCode".to_string(), room_code);
        }

        update_data.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        // Ownership is part of the write predicate, not just the pre-read
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patientId=eq.{}",
            appointment_id, patient_id
        );
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} updated successfully", updated.id);
        Ok(updated)
    }

    /// Remove a patient's own appointment. Records owned by someone else
    /// read as absent.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Deleting appointment {} for patient {}", appointment_id, patient_id);

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patientId=eq.{}",
            appointment_id, patient_id
        );
        let result: Vec<Value> = self.store.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let deleted: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} deleted", deleted.id);
        Ok(deleted)
    }

    /// Doctor accepts a pending appointment.
    pub async fn approve_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_status(appointment_id, doctor_id, AppointmentStatus::Approved, auth_token)
            .await
    }

    /// Doctor declines a pending appointment, cancelling it.
    pub async fn decline_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_status(appointment_id, doctor_id, AppointmentStatus::Cancelled, auth_token)
            .await
    }

    /// Doctor marks an approved appointment as held.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_status(appointment_id, doctor_id, AppointmentStatus::Completed, auth_token)
            .await
    }

    /// Resolve the room code for an online visit. Callers must be the
    /// booking patient or the assigned doctor.
    pub async fn join_appointment(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
        auth_token: &str,
    ) -> Result<JoinAppointmentResponse, AppointmentError> {
        debug!("Join request for appointment {} by {}", appointment_id, caller_id);

        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if appointment.patient_id != caller_id && appointment.doctor_id != caller_id {
            warn!(
                "User {} attempted to join appointment {} they are not part of",
                caller_id, appointment_id
            );
            return Err(AppointmentError::Unauthorized);
        }

        if !appointment.is_online() {
            return Err(AppointmentError::NotOnline);
        }

        // Creation mints a code for every online visit; a missing one means
        // the record predates that rule or was edited out-of-band.
        let room_code = appointment
            .room_code
            .ok_or(AppointmentError::RoomCodeMissing)?;

        Ok(JoinAppointmentResponse { room_code })
    }

    /// Move an appointment to `target` on behalf of its assigned doctor.
    /// The write is fenced on the observed status so concurrent doctors
    /// serialize at the store; whoever loses re-reads the winning state.
    async fn transition_status(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.doctor_id != doctor_id {
            warn!(
                "Doctor {} attempted to manage appointment {} assigned to {}",
                doctor_id, appointment_id, current.doctor_id
            );
            return Err(AppointmentError::Unauthorized);
        }

        // Re-delivered requests succeed without writing anything
        if current.status == target {
            debug!("Appointment {} already {}", appointment_id, target);
            return Ok(current);
        }

        self.lifecycle.validate_status_transition(&current.status, &target)?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(target.to_string()));
        update_data.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, current.status
        );
        let result: Vec<Value> = self.store.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if let Some(row) = result.first() {
            let updated: Appointment = serde_json::from_value(row.clone())
                .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;
            info!("Appointment {} moved to {} by doctor {}", appointment_id, target, doctor_id);
            return Ok(updated);
        }

        // The fence missed: another writer got there first. Re-read and
        // report idempotent success or a real conflict.
        let latest = self.get_appointment(appointment_id, auth_token).await?;
        if latest.status == target {
            debug!("Appointment {} already {} after race", appointment_id, target);
            return Ok(latest);
        }

        Err(AppointmentError::InvalidStatusTransition(latest.status))
    }

    /// Fetch an appointment scoped to its owning patient. Other patients'
    /// records read as absent.
    async fn get_owned_appointment(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patientId=eq.{}",
            appointment_id, patient_id
        );
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self.store.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut appointments = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<Appointment>(row) {
                Ok(appointment) => appointments.push(appointment),
                Err(e) => warn!("Skipping malformed appointment row: {}", e),
            }
        }

        Ok(appointments)
    }

    async fn doctor_cards_by_id(
        &self,
        doctor_ids: &[Uuid],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, DoctorListing>, AppointmentError> {
        let users = self.directory
            .users_by_ids(doctor_ids, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        let profiles = self.directory
            .profiles_by_user_ids(doctor_ids, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut profiles_by_user = HashMap::new();
        for profile in profiles {
            profiles_by_user.insert(profile.user_id, profile);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let profile = profiles_by_user.remove(&user.id);
                (user.id, DoctorListing::from_parts(user, profile))
            })
            .collect())
    }
}

/// Accepts `HH:MM` (and tolerates a seconds suffix) as a time of day.
fn parse_time_of_day(raw: &str) -> Result<NaiveTime, AppointmentError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| {
            AppointmentError::ValidationError(format!(
                "scheduledTime must be in HH:MM format, got '{}'",
                raw
            ))
        })
}

fn collect_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
