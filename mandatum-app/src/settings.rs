//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mandatum_core::permission::{AutoGrantGate, StaticGate};
use mandatum_core::{MicrophoneGate, PermissionDecision};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// Credential presented to the engine's activation service.
    /// `MANDATUM_ACCESS_KEY` in the environment wins over this value.
    pub access_key: String,
    /// Override for the bundled-resources directory holding model artifacts.
    pub bundle_dir: Option<PathBuf>,
    /// Microphone permission resolution: "auto", "granted", or "denied".
    pub permission_mode: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            bundle_dir: None,
            permission_mode: "auto".into(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.access_key = self.access_key.trim().to_string();
        self.permission_mode = normalize_permission_mode(&self.permission_mode);
        self.bundle_dir = self
            .bundle_dir
            .take()
            .filter(|dir| !dir.as_os_str().is_empty());
    }

    /// Environment wins over the settings file.
    pub fn resolve_access_key(&self) -> String {
        std::env::var("MANDATUM_ACCESS_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| self.access_key.clone())
    }

    /// Build the microphone gate this session should consult.
    pub fn microphone_gate(&self) -> Arc<dyn MicrophoneGate> {
        match self.permission_mode.as_str() {
            "granted" => Arc::new(StaticGate(PermissionDecision::Granted)),
            "denied" => Arc::new(StaticGate(PermissionDecision::Denied)),
            _ => Arc::new(AutoGrantGate),
        }
    }
}

/// Settings view returned to the webview; never carries the raw credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub has_access_key: bool,
    pub bundle_dir: Option<PathBuf>,
    pub permission_mode: String,
}

impl AppSettings {
    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            has_access_key: !self.access_key.is_empty(),
            bundle_dir: self.bundle_dir.clone(),
            permission_mode: self.permission_mode.clone(),
        }
    }
}

pub fn normalize_permission_mode(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "granted" | "grant" | "allow" => "granted".into(),
        "denied" | "deny" => "denied".into(),
        _ => "auto".into(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Mandatum")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("mandatum")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_mode_normalizes_to_the_closed_set() {
        assert_eq!(normalize_permission_mode("GRANTED"), "granted");
        assert_eq!(normalize_permission_mode("deny"), "denied");
        assert_eq!(normalize_permission_mode(""), "auto");
        assert_eq!(normalize_permission_mode("whatever"), "auto");
    }

    #[test]
    fn normalize_trims_the_access_key_and_empty_bundle_dir() {
        let mut settings = AppSettings {
            access_key: "  KEY==  ".into(),
            bundle_dir: Some(PathBuf::new()),
            permission_mode: "Allow".into(),
        };
        settings.normalize();
        assert_eq!(settings.access_key, "KEY==");
        assert!(settings.bundle_dir.is_none());
        assert_eq!(settings.permission_mode, "granted");
    }

    #[test]
    fn denied_mode_builds_a_denying_gate() {
        let settings = AppSettings {
            permission_mode: "denied".into(),
            ..AppSettings::default()
        };
        assert_eq!(
            settings.microphone_gate().request(),
            PermissionDecision::Denied
        );
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let settings = load_settings(Path::new("/nonexistent/mandatum/settings.json"));
        assert_eq!(settings.permission_mode, "auto");
        assert!(settings.access_key.is_empty());
    }
}
