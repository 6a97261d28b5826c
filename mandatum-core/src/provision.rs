//! Model artifact provisioning.
//!
//! The native engine opens its trained-grammar file by filesystem path, so
//! the bundled artifact must first be copied into a writable cache directory.
//! One artifact exists per supported platform, identified by filename
//! convention; anything outside the supported pair fails rather than
//! silently proceeding.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MandatumError, Result};

/// Base name of the bundled grammar context.
const CONTEXT_BASE: &str = "smart_lighting";

/// Resolve the artifact filename for an OS name (`std::env::consts::OS`
/// values).
///
/// # Errors
/// `MandatumError::UnsupportedPlatform` for anything outside the two
/// supported platforms.
pub fn artifact_name(os: &str) -> Result<String> {
    match os {
        "linux" | "windows" => Ok(format!("{CONTEXT_BASE}_{os}.ctx")),
        other => Err(MandatumError::UnsupportedPlatform {
            os: other.to_string(),
        }),
    }
}

/// Copies the bundled model artifact into cache storage.
pub struct ModelProvisioner {
    bundle_dir: PathBuf,
    cache_dir: PathBuf,
}

impl ModelProvisioner {
    pub fn new(bundle_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Provisioner over the default bundle and cache locations.
    pub fn with_default_paths() -> Self {
        Self::new(default_bundle_dir(), default_cache_dir())
    }

    /// Copy the running platform's artifact into the cache and return its
    /// absolute path.
    pub fn provision(&self) -> Result<PathBuf> {
        self.provision_for(std::env::consts::OS)
    }

    /// Platform-parameterised variant; `provision()` passes the running OS.
    ///
    /// Overwrites any previous copy, so repeated calls are idempotent.
    ///
    /// # Errors
    /// - `UnsupportedPlatform` when `os` has no bundled artifact.
    /// - `ModelNotFound` when the bundled artifact is missing.
    pub fn provision_for(&self, os: &str) -> Result<PathBuf> {
        let name = artifact_name(os)?;
        let source = self.bundle_dir.join(&name);
        if !source.is_file() {
            return Err(MandatumError::ModelNotFound { path: source });
        }

        fs::create_dir_all(&self.cache_dir)?;
        let target = self.cache_dir.join(&name);
        fs::copy(&source, &target)?;
        info!(artifact = %name, target = ?target, "model artifact provisioned");
        Ok(target)
    }
}

/// Bundled resources directory: `resources/` next to the executable.
pub fn default_bundle_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resources")
}

/// Writable cache directory for provisioned artifacts.
pub fn default_cache_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Mandatum")
            .join("cache")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".cache")
            })
            .join("mandatum")
    }
}
