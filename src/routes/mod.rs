pub mod cleanup;
pub mod error;
pub mod health;

pub use error::{ApiError, ErrorResponse};
