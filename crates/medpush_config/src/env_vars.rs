//! Environment variable naming for medpush configuration.
//!
//! Plain settings are overridden through `MEDPUSH__SECTION__KEY` variables,
//! secrets are injected wherever a config value is the literal
//! `"secret_from_env"` marker.

use std::env;
use tracing::warn;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "MEDPUSH";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "MEDPUSH_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Marker value replaced by an environment variable at load time
pub const SECRET_MARKER: &str = "secret_from_env";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// # Arguments
///
/// * `path` - The configuration path (e.g., "push.batch_size")
///
/// # Returns
///
/// The environment variable name (e.g., "MEDPUSH__PUSH__BATCH_SIZE")
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to an environment variable name
///
/// # Arguments
///
/// * `path` - The secret path (e.g., "firebase.key_path")
///
/// # Returns
///
/// The environment variable name (e.g., "MEDPUSH_SECRET_FIREBASE_KEY_PATH")
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to its unprefixed environment variable name
///
/// Deployments that predate the prefixed naming still export e.g.
/// `FIREBASE_KEY_PATH`, so it is consulted as a fallback.
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return path.to_uppercase();
    }

    let service = parts[0];
    let key = parts[1..].join(SECRET_SEPARATOR);
    format!("{}_{}", service, key).to_uppercase()
}

/// Get an environment variable for a configuration path
pub fn get_config_env_var(path: &str) -> Option<String> {
    env::var(config_path_to_env_var(path)).ok()
}

/// Get an environment variable for a secret path, falling back to the legacy name
pub fn get_secret_env_var(path: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_path_to_env_var(path)) {
        return Some(value);
    }

    env::var(legacy_secret_path_to_env_var(path)).ok()
}

/// Check if a path is a secret path
///
/// Paths containing "secret", "key", "password" or "token" are considered secret.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
}

/// Get an environment variable for a path, secret or not
pub fn get_env_var(path: &str) -> Option<String> {
    if is_secret_path(path) {
        get_secret_env_var(path)
    } else {
        get_config_env_var(path)
    }
}

/// Inject environment variables into a JSON value
///
/// Recursively replaces every `"secret_from_env"` string with the value of
/// the environment variable derived from its path. Markers without a matching
/// variable are left in place and logged.
///
/// # Returns
///
/// `true` if any values were replaced, `false` otherwise
pub fn inject_env_vars(value: &mut serde_json::Value) -> bool {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter_mut().enumerate() {
                    let mut new_path = path.clone();
                    new_path.push(i.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                if let Some(env_val) = get_env_var(&path_str) {
                    *s = env_val;
                    replaced = true;
                } else {
                    warn!("Environment variable for {} not found", path_str);
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_to_env_var() {
        assert_eq!(
            config_path_to_env_var("server.host"),
            "MEDPUSH__SERVER__HOST"
        );
        assert_eq!(
            config_path_to_env_var("push.max_tokens_per_doctor"),
            "MEDPUSH__PUSH__MAX_TOKENS_PER_DOCTOR"
        );
    }

    #[test]
    fn test_secret_path_to_env_var() {
        assert_eq!(
            secret_path_to_env_var("firebase.key_path"),
            "MEDPUSH_SECRET_FIREBASE_KEY_PATH"
        );
    }

    #[test]
    fn test_legacy_secret_path_to_env_var() {
        assert_eq!(
            legacy_secret_path_to_env_var("firebase.key_path"),
            "FIREBASE_KEY_PATH"
        );
        assert_eq!(legacy_secret_path_to_env_var("token"), "TOKEN");
    }

    #[test]
    fn test_is_secret_path() {
        assert!(is_secret_path("firebase.key_path"));
        assert!(is_secret_path("database.password"));
        assert!(!is_secret_path("server.host"));
        assert!(!is_secret_path("feed.timezone"));
    }

    #[test]
    fn test_inject_env_vars_replaces_marker() {
        env::set_var("MEDPUSH_SECRET_FIREBASE_KEY_PATH", "/run/secrets/fcm.json");
        let mut value = serde_json::json!({
            "firebase": { "project_id": "medpush-test", "key_path": "secret_from_env" }
        });

        assert!(inject_env_vars(&mut value));
        assert_eq!(value["firebase"]["key_path"], "/run/secrets/fcm.json");
        assert_eq!(value["firebase"]["project_id"], "medpush-test");
        env::remove_var("MEDPUSH_SECRET_FIREBASE_KEY_PATH");
    }

    #[test]
    fn test_inject_env_vars_keeps_unresolved_marker() {
        let mut value = serde_json::json!({ "vault": { "api_secret_unset": "secret_from_env" } });

        assert!(!inject_env_vars(&mut value));
        assert_eq!(value["vault"]["api_secret_unset"], SECRET_MARKER);
    }
}
