// --- File: crates/medpush_common/src/http/client.rs ---
use reqwest::{redirect::Policy, Client, Error as ReqwestError};
use std::time::Duration;

const USER_AGENT: &str = concat!("medpush/", env!("CARGO_PKG_VERSION"));

/// Connecting never gets more than this, whatever the request timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the HTTP client used for outbound gateway calls.
///
/// # Arguments
///
/// * `timeout_secs` - Whole-request timeout; a zero value is raised to one second
/// * `follow_redirects` - Whether 3xx responses are followed
///
/// # Errors
///
/// Returns the reqwest error when the TLS backend cannot be initialised.
pub fn create_client(timeout_secs: u64, follow_redirects: bool) -> Result<Client, ReqwestError> {
    let timeout = Duration::from_secs(timeout_secs.max(1));

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .pool_idle_timeout(Duration::from_secs(90))
        .redirect(if follow_redirects {
            Policy::limited(3)
        } else {
            Policy::none()
        })
        .build()
}
