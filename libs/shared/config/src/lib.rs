use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub datastore_url: String,
    pub datastore_api_key: String,
    pub jwt_secret: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            datastore_url: env::var("DATASTORE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATASTORE_URL not set, using empty value");
                    String::new()
                }),
            datastore_api_key: env::var("DATASTORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATASTORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("AUTH_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("AUTH_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.datastore_url.is_empty()
            && !self.datastore_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}
