use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub datastore_url: String,
    pub datastore_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            datastore_url: "http://localhost:54321".to_string(),
            datastore_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            datastore_url: self.datastore_url.clone(),
            datastore_api_key: self.datastore_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned store rows matching the wire schema of each collection.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn user_row(id: &str, role: &str, first_name: &str, last_name: &str, city: &str) -> serde_json::Value {
        json!({
            "id": id,
            "firstName": first_name,
            "lastName": last_name,
            "email": format!("{}.{}@example.com", first_name.to_lowercase(), last_name.to_lowercase()),
            "role": role,
            "phone": "+35312345678",
            "avatar": null,
            "gender": "Other",
            "address": {
                "street": "1 Main Street",
                "city": city,
                "state": "Leinster",
                "zip": "D01"
            }
        })
    }

    pub fn doctor_profile_row(user_id: &str) -> serde_json::Value {
        json!({
            "userId": user_id,
            "degree": "MB BCh BAO",
            "specialization": "General Practice",
            "experience": 8,
            "workingPlace": "City Clinic",
            "isAvailable": true
        })
    }

    pub fn appointment_row(id: &str, patient_id: &str, doctor_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": patient_id,
            "doctorId": doctor_id,
            "visitType": "online",
            "scheduledDate": "2031-06-01",
            "scheduledTime": "10:00",
            "status": "pending",
            "notes": "Follow-up consultation",
            "roomCode": "Ab3dE9",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    pub fn in_person_appointment_row(id: &str, patient_id: &str, doctor_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patientId": patient_id,
            "doctorId": doctor_id,
            "visitType": "in-person",
            "scheduledDate": "2031-06-01",
            "scheduledTime": "10:00",
            "status": "pending",
            "notes": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
