use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable that overrides the configured default org.
pub const DEFAULT_ORG_ENV: &str = "SFDEV_DEFAULT_ORG";

const SETTINGS_FILE: &str = "config.json";

/// Platform config directory: `<config_dir>/sfdev`, or `~/.sfdev` when the
/// platform has none.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("sfdev"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".sfdev")
        })
}

pub fn settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

/// Load a JSON config file. Missing, unreadable or corrupt files yield the
/// default value.
pub(crate) fn load_json_config<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt config, using defaults");
            T::default()
        }
    }
}

/// Save a JSON config file atomically (temp file + rename), owner-only on Unix.
pub(crate) fn save_json_config<T: Serialize>(path: &Path, config: &T) -> Result<(), String> {
    let dir = path
        .parent()
        .ok_or_else(|| format!("Config path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| SETTINGS_FILE.to_string());
    let temp = dir.join(format!("{file_name}.tmp.{}", std::process::id()));

    std::fs::write(&temp, &json).map_err(|e| format!("Failed to write temp config: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| format!("Failed to set config permissions: {e}"))?;
    }

    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        format!("Failed to commit config: {e}")
    })
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Org alias or username used when a call names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_org: Option<String>,
}

impl Settings {
    fn with_env_override(mut self) -> Self {
        if let Ok(org) = std::env::var(DEFAULT_ORG_ENV)
            && !org.trim().is_empty()
        {
            self.default_org = Some(org.trim().to_string());
        }
        self
    }
}

/// Where settings come from. Read on every operation so edits apply without
/// a restart.
#[derive(Clone, Debug)]
pub enum SettingsSource {
    Disk(PathBuf),
    Fixed(Settings),
}

impl Default for SettingsSource {
    fn default() -> Self {
        Self::Disk(settings_path())
    }
}

impl SettingsSource {
    /// Current settings with the environment override applied.
    pub fn current(&self) -> Settings {
        let settings = match self {
            Self::Disk(path) => load_json_config(path),
            Self::Fixed(settings) => settings.clone(),
        };
        settings.with_env_override()
    }

    /// Persist a new default org. Only disk-backed sources can be written.
    pub fn set_default_org(&self, org: Option<String>) -> Result<(), String> {
        match self {
            Self::Disk(path) => {
                let mut settings: Settings = load_json_config(path);
                settings.default_org = org.filter(|o| !o.trim().is_empty());
                save_json_config(path, &settings)
            }
            Self::Fixed(_) => Err("Settings are not backed by a file".to_string()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Disk(path) => Some(path),
            Self::Fixed(_) => None,
        }
    }
}
