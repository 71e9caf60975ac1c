use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("folio"))
        } else {
            ProjectDirs::from("", "", "folio").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("folio.log"))
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", "folio") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("folio_config.json")
        }
    }
}
