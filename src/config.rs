use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::gate::GateConfig;
use crate::player::{SessionConfig, SESSION_DURATION};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub playlist_url: Option<String>,
    pub playlist_file: Option<PathBuf>,
    pub min_display_ms: u64,
    pub max_display_ms: u64,
    pub ready_threshold: usize,
    pub overlay_fade_ms: u64,
    pub session_duration_secs: u32,
    pub skip_delay_ms: u64,
    pub player_grace_ms: u64,
    pub theme: Theme,
    pub analytics: bool,
}

impl Default for Config {
    fn default() -> Self {
        let gate = GateConfig::default();
        let session = SessionConfig::default();
        Self {
            playlist_url: None,
            playlist_file: None,
            min_display_ms: gate.min_display.as_millis() as u64,
            max_display_ms: gate.max_display.as_millis() as u64,
            ready_threshold: gate.ready_threshold,
            overlay_fade_ms: gate.overlay_fade.as_millis() as u64,
            session_duration_secs: SESSION_DURATION,
            skip_delay_ms: session.skip_delay.as_millis() as u64,
            player_grace_ms: session.player_grace.as_millis() as u64,
            theme: Theme::default(),
            analytics: true,
        }
    }
}

impl Config {
    /// Gate timings; a ceiling below the floor is raised to the floor.
    pub fn gate_config(&self) -> GateConfig {
        let max_display_ms = if self.max_display_ms < self.min_display_ms {
            warn!(
                min_display_ms = self.min_display_ms,
                max_display_ms = self.max_display_ms,
                "max display below min display, clamping"
            );
            self.min_display_ms
        } else {
            self.max_display_ms
        };
        GateConfig {
            min_display: Duration::from_millis(self.min_display_ms),
            max_display: Duration::from_millis(max_display_ms),
            ready_threshold: self.ready_threshold,
            overlay_fade: Duration::from_millis(self.overlay_fade_ms),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            session_duration_secs: self.session_duration_secs,
            skip_delay: Duration::from_millis(self.skip_delay_ms),
            player_grace: Duration::from_millis(self.player_grace_ms),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            playlist_url: Some("https://example.com/playlist.json".into()),
            playlist_file: None,
            min_display_ms: 1_000,
            max_display_ms: 4_000,
            ready_threshold: 3,
            overlay_fade_ms: 500,
            session_duration_secs: 60,
            skip_delay_ms: 1_000,
            player_grace_ms: 2_000,
            theme: Theme::Dark,
            analytics: false,
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, "{ nope").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "theme": "dark", "session_duration_secs": 90 }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.session_duration_secs, 90);
        assert_eq!(cfg.max_display_ms, 6_000);
    }

    #[test]
    fn ceiling_below_floor_is_clamped() {
        let cfg = Config {
            min_display_ms: 3_000,
            max_display_ms: 1_000,
            ..Config::default()
        };
        let gate = cfg.gate_config();
        assert_eq!(gate.max_display, gate.min_display);
    }

    #[test]
    fn theme_toggles_and_displays_lowercase() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().to_string(), "light");
    }
}
