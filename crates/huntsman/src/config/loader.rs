use std::path::Path;

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_yaml::from_str(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Loads from `path` when given, otherwise returns defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(Settings::default()),
    }
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let fail = |message: String| Err(ConfigError::Validation { message });

    if settings.rank_limit == 0 {
        return fail("rank_limit must be greater than zero".to_string());
    }
    if settings.generate_limit == 0 {
        return fail("generate_limit must be greater than zero".to_string());
    }
    if settings.stale_claim_timeout_secs == 0 {
        return fail("stale_claim_timeout_secs must be greater than zero".to_string());
    }
    if settings.daemon_interval_secs == 0 {
        return fail("daemon_interval_secs must be greater than zero".to_string());
    }
    if settings.target_language.trim().is_empty() {
        return fail("target_language must not be empty".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_gets_defaults() {
        let settings = load_settings_from_str("{}").unwrap();
        assert_eq!(settings.rank_limit, 100);
        assert_eq!(settings.generate_limit, 10);
        assert_eq!(settings.stale_claim_timeout_secs, 900);
        assert_eq!(settings.daemon_interval_secs, 300);
        assert_eq!(settings.target_language, "en");
        assert_eq!(settings.stage_time_budget_secs, 0);
        assert!(!settings.skip_rendering);
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn test_overrides_apply() {
        let settings = load_settings_from_str(
            "database_path: /tmp/test.db\nrank_limit: 5\nskip_rendering: true\n",
        )
        .unwrap();
        assert_eq!(
            settings.database_path.as_deref(),
            Some(Path::new("/tmp/test.db"))
        );
        assert_eq!(settings.rank_limit, 5);
        assert!(settings.skip_rendering);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = load_settings_from_str("rank_limit: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(load_settings_from_str("stale_claim_timeout_secs: 0\n").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(load_settings_from_str("bogus_field: 1\n").is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_settings(Path::new("/nonexistent/huntsman.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let settings = load_or_default(None).unwrap();
        assert_eq!(settings.rank_limit, 100);
    }
}
