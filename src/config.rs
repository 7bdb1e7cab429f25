use std::{env, fs, path::PathBuf};

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::editor::PanelGeometry;
use crate::tui::keybindings::{KeyBinding, KeyBindings};
use crate::tui::theme::{Theme, ThemeName};

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub theme: ThemeName,
    #[serde(default)]
    pub editor: PanelGeometry,
    #[serde(default)]
    pub keybindings: Vec<KeyBinding>,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Load settings from `config_path`, or from the home config file
    ///
    /// The home file is created from the embedded defaults on first run.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?;

        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            let home_cfg = default_home_config_path();
            if !home_cfg.exists() {
                debug!("Writing default config to {}", home_cfg.display());
                if let Some(parent) = home_cfg.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(e) = fs::write(&home_cfg, CONFIG) {
                    warn!("Could not write default config {}: {e}", home_cfg.display());
                }
            }
            home_cfg
        };

        builder = builder.add_source(
            config::File::from(selected_path)
                .format(config::FileFormat::Json5)
                .required(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Settings from the embedded defaults only
    pub fn embedded() -> Result<Self, json5::Error> {
        let mut cfg: Self = json5::from_str(CONFIG)?;
        cfg.config.data_dir = get_data_dir();
        cfg.config.config_dir = get_config_dir();
        Ok(cfg)
    }

    pub fn keybindings(&self) -> KeyBindings {
        KeyBindings::with_overrides(&self.keybindings)
    }

    pub fn theme(&self) -> Theme {
        Theme::from_name(self.theme)
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with('~') {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen('~', &base.home_dir().to_string_lossy(), 1));
            }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".cohortui-config.json5");
    }
    PathBuf::from(".cohortui-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::action::Action;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_defaults_parse() {
        let cfg = Config::embedded().unwrap();
        assert_eq!(cfg.theme, ThemeName::Dark);
        assert_eq!(cfg.editor, PanelGeometry::default());
        assert!(cfg.keybindings.is_empty());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cohortui.json5");
        fs::write(
            &path,
            r#"{
                theme: "light",
                editor: { composer_width: 60 },
                keybindings: [ { key: "x", action: "DeleteFilter" } ],
            }"#,
        )
        .unwrap();

        let cfg = Config::from_path(Some(&path)).unwrap();
        assert_eq!(cfg.theme, ThemeName::Light);
        assert_eq!(cfg.editor.composer_width, 60);
        assert_eq!(cfg.editor.gap, 1);
        assert_eq!(cfg.config.data_dir, get_data_dir());

        let x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(cfg.keybindings().get_action(&x), Some(Action::DeleteFilter));
        assert_eq!(cfg.theme().name, "Light");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json5");
        assert!(Config::from_path(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        let path = PathBuf::from("/tmp/config.json5");
        assert_eq!(expand_tilde(&path), path);
    }
}
