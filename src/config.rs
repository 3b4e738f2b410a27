use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::constants;
use crate::session::Timeouts;

/// User preferences, stored as `prefs.toml` in the platform config directory.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub server_url: Option<String>,
  pub request_timeout_secs: Option<u64>,
  pub theme_name: Option<String>,
}

/// Effective settings after layering constants, preferences and command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub server_url: String,
  pub timeouts: Timeouts,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "clipsage")
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "config: ignoring unreadable prefs"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self)
          && let Err(e) = std::fs::write(&config_file, content)
        {
          warn!(path = %config_file.display(), err = %e, "config: failed to save prefs");
        }
      }
    }
  }

  /// Flags win over preferences, preferences over built-in constants.
  pub fn settings(&self, server_flag: Option<&str>, timeout_flag: Option<u64>) -> Settings {
    let c = constants();
    let server_url =
      server_flag.map(str::to_string).or_else(|| self.server_url.clone()).unwrap_or_else(|| c.default_server_url.clone());
    let request_secs = timeout_flag.or(self.request_timeout_secs).unwrap_or(c.request_timeout_secs).max(1);
    Settings {
      server_url,
      timeouts: Timeouts {
        request: Duration::from_secs(request_secs),
        upload: Duration::from_secs(c.upload_timeout_secs.max(request_secs)),
      },
    }
  }
}

/// Directory for rolling log files.
pub fn log_dir() -> std::path::PathBuf {
  project_dirs().map(|d| d.data_local_dir().join("logs")).unwrap_or_else(|| std::env::temp_dir().join("clipsage-logs"))
}
