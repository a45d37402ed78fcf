// --- File: crates/medpush_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod features; // Runtime feature flags
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Shared domain records
pub mod services; // Push gateway contract

// Re-export error types and utilities for easier access
pub use error::{
    external_service_error, forbidden, not_found, validation_error, HttpStatusCode, MedpushError,
};

// Re-export HTTP utilities for easier access
pub use http::client::create_client;

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, parse_level};

pub use features::is_firebase_enabled;

// This crate holds what every medpush crate shares: the error type and its HTTP
// mapping, logging setup, the persisted records and the push gateway seam.
