use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Directory record from the `users` collection. The `select` projection in
/// `DirectoryService` never asks for the password column, so it is absent here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// Professional details from the `doctor_profiles` collection, keyed by the
/// doctor's user id. A doctor without a saved profile simply has no row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub user_id: Uuid,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub experience: Option<i32>,
    #[serde(default)]
    pub working_place: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

/// Public directory entry: identity merged with professional details, one flat
/// object per doctor. Role and credentials are deliberately not part of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<String>,
    pub address: Option<Address>,
    pub degree: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<i32>,
    pub working_place: Option<String>,
    pub is_available: Option<bool>,
}

impl DoctorListing {
    pub fn from_parts(user: UserRecord, profile: Option<DoctorProfile>) -> Self {
        let (degree, specialization, experience, working_place, is_available) = match profile {
            Some(profile) => (
                profile.degree,
                profile.specialization,
                profile.experience,
                profile.working_place,
                profile.is_available,
            ),
            None => (None, None, None, None, None),
        };

        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            avatar: user.avatar,
            gender: user.gender,
            address: user.address,
            degree,
            specialization,
            experience,
            working_place,
            is_available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDoctors {
    pub doctors: Vec<DoctorListing>,
    pub total_doctors: usize,
    pub city: String,
}

/// Status counts over every appointment assigned to one doctor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub completed: usize,
    pub cancelled: usize,
}
