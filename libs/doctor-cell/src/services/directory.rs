use std::collections::HashMap;

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{CityDoctors, DashboardSummary, DoctorListing, DoctorProfile, UserRecord};

// Explicit projections keep credentials out of every directory read.
const USER_COLUMNS: &str = "id,firstName,lastName,email,role,phone,avatar,gender,address";
const PROFILE_COLUMNS: &str = "userId,degree,specialization,experience,workingPlace,isAvailable";

pub struct DirectoryService {
    store: StoreClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// Fetch a single directory record by id.
    pub async fn find_user(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<UserRecord>> {
        debug!("Fetching directory record: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}&select={}", user_id, USER_COLUMNS);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Resolve an id to a doctor-role record. An id that exists but belongs
    /// to another role reads as absent.
    pub async fn find_doctor(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<UserRecord>> {
        debug!("Resolving doctor: {}", user_id);

        let path = format!(
            "/rest/v1/users?id=eq.{}&role=eq.doctor&select={}",
            user_id, USER_COLUMNS
        );
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Batch-fetch directory records for a set of ids.
    pub async fn users_by_ids(
        &self,
        ids: &[Uuid],
        auth_token: Option<&str>,
    ) -> Result<Vec<UserRecord>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/users?id=in.({})&select={}", id_list, USER_COLUMNS);

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut users = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<UserRecord>(row) {
                Ok(user) => users.push(user),
                Err(e) => warn!("Skipping malformed directory record: {}", e),
            }
        }

        Ok(users)
    }

    /// Batch-fetch professional profiles for a set of doctor user ids.
    pub async fn profiles_by_user_ids(
        &self,
        ids: &[Uuid],
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorProfile>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/doctor_profiles?userId=in.({})&select={}",
            id_list, PROFILE_COLUMNS
        );

        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut profiles = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<DoctorProfile>(row) {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!("Skipping malformed doctor profile: {}", e),
            }
        }

        Ok(profiles)
    }

    /// List every doctor in the directory with professional details merged in.
    pub async fn list_doctors(&self, auth_token: Option<&str>) -> Result<Vec<DoctorListing>> {
        debug!("Listing doctor directory");

        let path = format!("/rest/v1/users?role=eq.doctor&select={}", USER_COLUMNS);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut users = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<UserRecord>(row) {
                Ok(user) => users.push(user),
                Err(e) => warn!("Skipping malformed directory record: {}", e),
            }
        }

        self.merge_profiles(users, auth_token).await
    }

    /// List doctors practicing in the caller's city, most experienced first.
    /// `None` means the caller has no usable city on record.
    pub async fn list_doctors_in_city(
        &self,
        caller_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<CityDoctors>> {
        let caller = match self.find_user(caller_id, auth_token).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let city = match caller.address.as_ref().and_then(|address| address.city.clone()) {
            Some(city) if !city.is_empty() => city,
            _ => return Ok(None),
        };

        debug!("Searching doctors in city: {}", city);

        let path = format!(
            "/rest/v1/users?role=eq.doctor&address->>city=eq.{}&select={}",
            urlencoding::encode(&city),
            USER_COLUMNS
        );
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut users = Vec::with_capacity(result.len());
        for row in result {
            match serde_json::from_value::<UserRecord>(row) {
                Ok(user) if user.id != caller_id => users.push(user),
                Ok(_) => {} // a doctor searching never sees themselves
                Err(e) => warn!("Skipping malformed directory record: {}", e),
            }
        }

        let mut doctors = self.merge_profiles(users, auth_token).await?;
        doctors.sort_by(|a, b| {
            b.experience
                .unwrap_or(i32::MIN)
                .cmp(&a.experience.unwrap_or(i32::MIN))
        });

        Ok(Some(CityDoctors {
            total_doctors: doctors.len(),
            doctors,
            city,
        }))
    }

    /// Status counts for the doctor dashboard, computed over the raw
    /// appointment rows assigned to this doctor.
    pub async fn dashboard_summary(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<DashboardSummary> {
        debug!("Building dashboard summary for doctor: {}", doctor_id);

        let path = format!("/rest/v1/appointments?doctorId=eq.{}&select=status", doctor_id);
        let result: Vec<Value> = self.store.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut summary = DashboardSummary {
            total: result.len(),
            ..Default::default()
        };

        for row in &result {
            match row["status"].as_str() {
                Some("pending") => summary.pending += 1,
                Some("approved") => summary.approved += 1,
                Some("completed") => summary.completed += 1,
                Some("cancelled") => summary.cancelled += 1,
                _ => {}
            }
        }

        Ok(summary)
    }

    async fn merge_profiles(
        &self,
        users: Vec<UserRecord>,
        auth_token: Option<&str>,
    ) -> Result<Vec<DoctorListing>> {
        let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
        let profiles = self.profiles_by_user_ids(&ids, auth_token).await?;

        let mut profiles_by_user: HashMap<Uuid, DoctorProfile> = profiles
            .into_iter()
            .map(|profile| (profile.user_id, profile))
            .collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let profile = profiles_by_user.remove(&user.id);
                DoctorListing::from_parts(user, profile)
            })
            .collect())
    }
}
