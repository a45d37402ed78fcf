use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. MEDPUSH__DATABASE__URL=sqlite:data/medpush.db
}

// --- Firebase Config ---
// Holds non-secret FCM settings. The service account key path is usually
// provided as "secret_from_env" and resolved from MEDPUSH_SECRET_FIREBASE_KEY_PATH.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub key_path: Option<String>,
    #[serde(default = "default_fcm_api_base_url")]
    pub api_base_url: String,
}

fn default_fcm_api_base_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

// --- Push delivery and token lifecycle ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PushConfig {
    /// Maximum number of push tokens kept per doctor; older ones are evicted.
    pub max_tokens_per_doctor: u32,
    /// Number of tokens handed to the gateway in one broadcast chunk.
    pub batch_size: usize,
    /// Upper bound on in-flight gateway requests within a batch.
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    /// Tokens created longer ago than this are removed by the retention sweep.
    pub stale_after_days: i64,
    pub retention_interval_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_doctor: 10,
            batch_size: 500,
            max_concurrency: 16,
            request_timeout_secs: 10,
            stale_after_days: 180,
            retention_interval_secs: 86_400,
        }
    }
}

// --- Notification feed ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    /// IANA zone used to decide where "today" starts.
    pub timezone: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            timezone: "UTC".to_string(),
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_firebase: bool,

    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
