//! User configuration – reads/writes `~/.worldframe/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use worldframe_world::Topology;

/// Topology the REPL starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewChoice {
    #[default]
    Commanded,
    Measured,
    /// Only constant relations.
    Static,
}

impl ViewChoice {
    pub fn topology(self) -> Topology {
        match self {
            Self::Commanded => Topology::commanded(),
            Self::Measured => Topology::measured(),
            Self::Static => Topology::measured().without_dynamic(),
        }
    }
}

impl std::str::FromStr for ViewChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "commanded" => Ok(Self::Commanded),
            "measured" => Ok(Self::Measured),
            "static" => Ok(Self::Static),
            other => Err(format!("unknown view '{other}' (expected commanded, measured or static)")),
        }
    }
}

impl std::fmt::Display for ViewChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commanded => write!(f, "commanded"),
            Self::Measured => write!(f, "measured"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scene loaded when no path is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_path: Option<PathBuf>,

    #[serde(default)]
    pub default_view: ViewChoice,

    /// Decimals printed for lengths and angles.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene_path: None,
            default_view: ViewChoice::default(),
            precision: default_precision(),
        }
    }
}

/// Return the path to `~/.worldframe/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".worldframe").join("config.toml")
}

/// Settings in effect after environment overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub config: Config,
    /// `false` when no config file exists yet and defaults were used.
    pub from_file: bool,
}

/// Load the config from disk, or the defaults when there is no file, with
/// environment overrides applied either way.
pub fn load() -> Result<Loaded, String> {
    load_at(&config_path())
}

pub(crate) fn load_at(path: &Path) -> Result<Loaded, String> {
    let file = load_from(path)?;
    let from_file = file.is_some();
    let mut config = file.unwrap_or_default();
    apply_env_overrides(&mut config);
    Ok(Loaded { config, from_file })
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `WORLDFRAME_*` environment overrides.
///
/// | Variable | Config field |
/// |---|---|
/// | `WORLDFRAME_SCENE` | `scene_path` |
/// | `WORLDFRAME_VIEW` | `default_view` |
/// | `WORLDFRAME_PRECISION` | `precision` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WORLDFRAME_SCENE") {
        cfg.scene_path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("WORLDFRAME_VIEW")
        && let Ok(view) = v.parse::<ViewChoice>()
    {
        cfg.default_view = view;
    }
    if let Ok(v) = std::env::var("WORLDFRAME_PRECISION")
        && let Ok(precision) = v.parse::<usize>()
    {
        cfg.precision = precision.min(12);
    }
}

/// Save the config, creating `~/.worldframe/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            scene_path: Some(PathBuf::from("/srv/cell.toml")),
            default_view: ViewChoice::Measured,
            precision: 3,
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: Config = toml::from_str("").expect("parse");
        assert_eq!(cfg, Config::default());
        let cfg: Config = toml::from_str("default_view = \"static\"").expect("parse");
        assert_eq!(cfg.default_view, ViewChoice::Static);
        assert_eq!(cfg.precision, 4);
    }

    #[test]
    fn config_path_points_to_worldframe_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".worldframe"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "precision = \"many\"").expect("write");
        assert!(load_from(&path).unwrap_err().contains("parse"));
    }

    #[test]
    fn view_choice_parsing() {
        assert_eq!("Measured".parse::<ViewChoice>(), Ok(ViewChoice::Measured));
        assert!("sideways".parse::<ViewChoice>().is_err());
        assert_eq!(ViewChoice::Static.to_string(), "static");
    }

    // The overrides share process-wide variables, so they are exercised in
    // one test.
    #[test]
    fn apply_env_overrides_changes_fields() {
        // SAFETY: only this test touches WORLDFRAME_* variables and HOME.
        unsafe {
            std::env::set_var("WORLDFRAME_SCENE", "/tmp/scene.toml");
            std::env::set_var("WORLDFRAME_VIEW", "measured");
            std::env::set_var("WORLDFRAME_PRECISION", "2");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.scene_path, Some(PathBuf::from("/tmp/scene.toml")));
        assert_eq!(cfg.default_view, ViewChoice::Measured);
        assert_eq!(cfg.precision, 2);

        unsafe {
            std::env::set_var("WORLDFRAME_VIEW", "upside-down");
            std::env::set_var("WORLDFRAME_PRECISION", "not-a-number");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.default_view, ViewChoice::Commanded);
        assert_eq!(cfg.precision, 4);

        // No config file yet: the defaults still pick up the overrides.
        let home = tempfile::tempdir().expect("tmp dir");
        let previous_home = std::env::var_os("HOME");
        unsafe {
            std::env::set_var("HOME", home.path());
            std::env::set_var("WORLDFRAME_VIEW", "measured");
            std::env::set_var("WORLDFRAME_SCENE", "/tmp/cell.toml");
        }
        let loaded = load().expect("defaults");
        assert!(!loaded.from_file);
        assert_eq!(loaded.config.default_view, ViewChoice::Measured);
        assert_eq!(loaded.config.scene_path, Some(PathBuf::from("/tmp/cell.toml")));
        assert_eq!(loaded.config.precision, 4);

        save(&Config::default()).expect("save");
        let loaded = load().expect("from file");
        assert!(loaded.from_file);
        assert_eq!(loaded.config.default_view, ViewChoice::Measured);

        unsafe {
            match previous_home {
                Some(previous) => std::env::set_var("HOME", previous),
                None => std::env::remove_var("HOME"),
            }
        }

        unsafe {
            std::env::remove_var("WORLDFRAME_SCENE");
            std::env::remove_var("WORLDFRAME_VIEW");
            std::env::remove_var("WORLDFRAME_PRECISION");
        }
    }
}
