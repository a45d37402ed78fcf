//! Runtime feature flags.
//!
//! A feature is on when its `use_*` flag is set *and* its configuration
//! section is present.

use medpush_config::AppConfig;

/// Check if a feature is enabled at runtime based on configuration.
///
/// # Arguments
///
/// * `use_feature` - The configuration flag that enables the feature
/// * `feature_config` - The configuration section for the feature
pub fn is_feature_enabled<T>(use_feature: bool, feature_config: Option<&T>) -> bool {
    use_feature && feature_config.is_some()
}

/// Check if push delivery through Firebase Cloud Messaging is enabled.
pub fn is_firebase_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_firebase, config.firebase.as_ref())
}
