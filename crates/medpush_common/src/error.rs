// --- File: crates/medpush_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type for all medpush errors.
///
/// Each crate keeps its own error enum and converts into this one at the
/// HTTP boundary by implementing `From<SpecificError> for MedpushError`.
#[derive(Error, Debug)]
pub enum MedpushError {
    /// The caller may not act on the resource
    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for MedpushError {
    fn status_code(&self) -> u16 {
        match self {
            MedpushError::ForbiddenError(_) => 403,
            MedpushError::ValidationError(_) => 400,
            MedpushError::DatabaseError(_) => 500,
            MedpushError::ExternalServiceError { .. } => 502,
            MedpushError::NotFoundError(_) => 404,
        }
    }
}

// Constructors used at the HTTP boundary
pub fn validation_error<T: fmt::Display>(message: T) -> MedpushError {
    MedpushError::ValidationError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> MedpushError {
    MedpushError::NotFoundError(message.to_string())
}

pub fn forbidden<T: fmt::Display>(message: T) -> MedpushError {
    MedpushError::ForbiddenError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> MedpushError {
    MedpushError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}
