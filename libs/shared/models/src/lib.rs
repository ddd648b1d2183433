pub mod auth;
pub mod error;
pub mod response;

pub use auth::User;
pub use error::AppError;
pub use response::ApiResponse;
