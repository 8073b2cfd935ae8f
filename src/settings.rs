use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::components::history::DEFAULT_MAX_HISTORY;

pub const APP_DIR_NAME: &str = "AdStudio";

/// User settings, stored as TOML in the platform config directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// History entries kept per editing session.
    pub max_undo_steps: usize,
    /// Template store file. `None` uses `<data dir>/AdStudio/templates.json`.
    pub template_store_path: Option<PathBuf>,
    /// Directories searched for font files before the system fonts.
    pub font_directories: Vec<PathBuf>,
    pub use_system_fonts: bool,
    /// Default folder for exported PNGs.
    pub export_directory: Option<PathBuf>,
    /// One of error, warn, info, debug, trace.
    pub log_level: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_MAX_HISTORY,
            template_store_path: None,
            font_directories: Vec::new(),
            use_system_fonts: true,
            export_directory: None,
            log_level: "info".to_string(),
        }
    }
}

impl EditorSettings {
    /// Load from the default location. Missing or malformed files yield defaults.
    pub fn load() -> Self {
        match settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("Could not read settings {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match toml::from_str::<EditorSettings>(&text) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                log::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), String> {
        let path = settings_path().ok_or_else(|| "no settings directory".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let text = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        crate::io::write_atomic(path, text.as_bytes()).map_err(|e| e.to_string())
    }

    fn sanitized(mut self) -> Self {
        if self.max_undo_steps == 0 {
            self.max_undo_steps = DEFAULT_MAX_HISTORY;
        }
        if log_level_filter(&self.log_level).is_none() {
            log::warn!("Unknown log level '{}', using info", self.log_level);
            self.log_level = "info".to_string();
        }
        self
    }

    pub fn template_store_path(&self) -> PathBuf {
        self.template_store_path
            .clone()
            .unwrap_or_else(|| data_dir().join(APP_DIR_NAME).join("templates.json"))
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        log_level_filter(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }
}

fn log_level_filter(name: &str) -> Option<log::LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => Some(log::LevelFilter::Off),
        "error" => Some(log::LevelFilter::Error),
        "warn" | "warning" => Some(log::LevelFilter::Warn),
        "info" => Some(log::LevelFilter::Info),
        "debug" => Some(log::LevelFilter::Debug),
        "trace" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

/// Location of `settings.toml` for this platform.
pub fn settings_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
        return Some(PathBuf::from(appdata).join(APP_DIR_NAME).join("settings.toml"));
    }
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR_NAME)
                .join("settings.toml"),
        );
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
            .ok()?;
        Some(config_dir.join("adstudio").join("settings.toml"))
    }
}

/// Platform data directory (without the app sub-folder).
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "max_undo_steps = 20\nfont_directories = [\"/fonts\"]\n").unwrap();

        let settings = EditorSettings::load_from(&path);
        assert_eq!(settings.max_undo_steps, 20);
        assert_eq!(settings.font_directories, vec![PathBuf::from("/fonts")]);
        assert!(settings.use_system_fonts);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn malformed_or_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        assert_eq!(EditorSettings::load_from(&path), EditorSettings::default());

        std::fs::write(&path, "max_undo_steps = \"lots\"").unwrap();
        assert_eq!(EditorSettings::load_from(&path), EditorSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = EditorSettings {
            max_undo_steps: 10,
            template_store_path: Some(dir.path().join("t.json")),
            log_level: "debug".to_string(),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        let loaded = EditorSettings::load_from(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.level_filter(), log::LevelFilter::Debug);
        assert_eq!(loaded.template_store_path(), dir.path().join("t.json"));
    }
}
