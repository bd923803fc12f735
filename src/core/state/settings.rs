use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::maven::ResolverOptions;

const APP_DIR_NAME: &str = "jarlink";
const SETTINGS_FILE: &str = "settings.json";

/// Persisted settings. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where fetched jars are cached.
    pub cache_dir: PathBuf,
    pub create_cache_dir: bool,
    pub prune_stale_versions: bool,
    /// A missing meta-configuration is an error instead of `false`.
    pub fail_hard: bool,
    /// Unsatisfied dependencies are an error instead of a report entry.
    pub strict: bool,
    pub verify_checksums: bool,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_data_dir().join("libraries"),
            create_cache_dir: false,
            prune_stale_versions: true,
            fail_hard: false,
            strict: false,
            verify_checksums: false,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

impl Settings {
    /// Load `settings.json` from `data_dir`; defaults when absent or corrupt.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Corrupt settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn load_default() -> Self {
        Self::load(&default_data_dir())
    }

    pub fn save(&self, data_dir: &Path) -> JarlinkResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| JarlinkError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| JarlinkError::io(&path, e))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            create_cache_dir: self.create_cache_dir,
            prune_stale_versions: self.prune_stale_versions,
            verify_checksums: self.verify_checksums,
        }
    }
}

/// `<platform data dir>/jarlink`, or `./jarlink` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sources::test_support::temp_dir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = temp_dir("settings-missing");
        let settings = Settings::load(&dir);
        assert!(settings.prune_stale_versions);
        assert!(!settings.fail_hard);
        assert_eq!(settings.request_timeout(), Duration::from_secs(60));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = temp_dir("settings-partial");
        std::fs::write(
            dir.join(SETTINGS_FILE),
            r#"{ "strict": true, "cache_dir": "/srv/jars" }"#,
        )
        .unwrap();
        let settings = Settings::load(&dir);
        assert!(settings.strict);
        assert_eq!(settings.cache_dir, PathBuf::from("/srv/jars"));
        assert_eq!(settings.connect_timeout_secs, 10);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load() {
        let dir = temp_dir("settings-save");
        let settings = Settings {
            verify_checksums: true,
            ..Settings::default()
        };
        settings.save(&dir).unwrap();
        assert!(Settings::load(&dir).verify_checksums);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = temp_dir("settings-corrupt");
        std::fs::write(dir.join(SETTINGS_FILE), "{ not json").unwrap();
        assert!(!Settings::load(&dir).strict);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
