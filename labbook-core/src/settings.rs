//! Settings for labbook hosts.
//!
//! Layered with `figment`: defaults, then `~/.config/labbook/config.toml`,
//! then `labbook.toml` in the workspace, then `LABBOOK_*` variables.

use crate::error::{LabError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Name of the workspace-level settings file.
pub const WORKSPACE_SETTINGS_FILE: &str = "labbook.toml";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabbookSettings {
    /// Directory new experiments are created in.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for LabbookSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log: LogSettings::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive for the stderr layer.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// When set, JSON logs are also written to daily files in this directory.
    #[serde(default)]
    pub json_dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json_dir: None,
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Prefix of settings environment variables; nested keys use `__`
/// (`LABBOOK_OUTPUT_DIR`, `LABBOOK_LOG__FILTER`).
pub const ENV_PREFIX: &str = "LABBOOK_";

/// Per-user settings file, if the platform has a config directory.
pub fn user_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "labbook", "labbook")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl LabbookSettings {
    /// The provider chain, lowest priority first: built-in defaults, user
    /// settings file, workspace `labbook.toml`, `LABBOOK_*` environment.
    ///
    /// Hosts can `merge` their own providers (command-line flags, say) on
    /// top before calling [`LabbookSettings::from_figment`].
    pub fn figment(workspace: Option<&Path>) -> Figment {
        let files = [
            user_settings_path(),
            workspace.map(|ws| ws.join(WORKSPACE_SETTINGS_FILE)),
        ];
        files
            .into_iter()
            .flatten()
            .filter(|path| path.is_file())
            .fold(
                Figment::from(Serialized::defaults(Self::default())),
                |figment, path| figment.merge(Toml::file(path)),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate settings from `figment`.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Self = figment
            .extract()
            .map_err(|e| LabError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings for `workspace` from the default provider chain.
    pub fn load(workspace: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(workspace))
    }

    /// Directories must be usable as directories and the log filter must
    /// parse; problems surface here rather than at the first experiment.
    pub fn validate(&self) -> Result<()> {
        check_dir("output_dir", &self.output_dir)?;
        if let Some(json_dir) = &self.log.json_dir {
            check_dir("log.json_dir", json_dir)?;
        }
        EnvFilter::try_new(&self.log.filter).map_err(|e| {
            LabError::Settings(format!("log.filter '{}': {e}", self.log.filter))
        })?;
        Ok(())
    }
}

fn check_dir(key: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(LabError::Settings(format!("{key} is empty")));
    }
    if path.exists() && !path.is_dir() {
        return Err(LabError::Settings(format!(
            "{key} is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let settings = LabbookSettings::default();
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.log.filter, "info");
        assert!(settings.log.json_dir.is_none());
    }

    fn settings_error(e: LabError) -> figment::Error {
        figment::Error::from(e.to_string())
    }

    #[test]
    fn test_workspace_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                WORKSPACE_SETTINGS_FILE,
                r#"
                output_dir = "runs"

                [log]
                filter = "debug"
                "#,
            )?;
            let settings = LabbookSettings::load(Some(jail.directory())).map_err(settings_error)?;
            assert_eq!(settings.output_dir, PathBuf::from("runs"));
            assert_eq!(settings.log.filter, "debug");

            jail.set_env("LABBOOK_LOG__FILTER", "labbook_core=trace");
            let settings = LabbookSettings::load(Some(jail.directory())).map_err(settings_error)?;
            assert_eq!(settings.log.filter, "labbook_core=trace");
            assert_eq!(settings.output_dir, PathBuf::from("runs"));
            Ok(())
        });
    }

    #[test]
    fn test_host_provider_merges_last() {
        Jail::expect_with(|jail| {
            jail.set_env("LABBOOK_OUTPUT_DIR", "from-env");
            let figment = LabbookSettings::figment(None)
                .merge(Serialized::default("output_dir", "/srv/experiments"));
            let settings = LabbookSettings::from_figment(&figment).map_err(settings_error)?;
            assert_eq!(settings.output_dir, PathBuf::from("/srv/experiments"));
            Ok(())
        });
    }

    #[test]
    fn test_empty_output_dir_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(WORKSPACE_SETTINGS_FILE, r#"output_dir = """#)?;
            let err = LabbookSettings::load(Some(jail.directory())).unwrap_err();
            assert!(matches!(err, LabError::Settings(ref msg) if msg.contains("output_dir")));
            Ok(())
        });
    }

    #[test]
    fn test_output_dir_pointing_at_file_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("runs", "not a directory")?;
            jail.create_file(WORKSPACE_SETTINGS_FILE, r#"output_dir = "runs""#)?;
            let err = LabbookSettings::load(Some(jail.directory())).unwrap_err();
            assert!(
                matches!(err, LabError::Settings(ref msg) if msg.contains("not a directory")),
                "{err}"
            );
            Ok(())
        });
    }

    #[test]
    fn test_bad_log_filter_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("LABBOOK_LOG__FILTER", "labbook_core=notalevel");
            let err = LabbookSettings::load(None).unwrap_err();
            assert!(matches!(err, LabError::Settings(ref msg) if msg.contains("log.filter")));
            Ok(())
        });
    }

    #[test]
    fn test_wrong_type_is_settings_error() {
        Jail::expect_with(|jail| {
            jail.create_file(WORKSPACE_SETTINGS_FILE, "[log]\njson_dir = 3\n")?;
            let err = LabbookSettings::load(Some(jail.directory())).unwrap_err();
            assert!(matches!(err, LabError::Settings(_)));
            Ok(())
        });
    }
}
