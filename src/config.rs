//! Configuration documents for pie-menu-host
//!
//! Two JSON documents live in the config directory:
//! - `settings.json` holds application settings (themes, focus delay, logging)
//! - `menus.json` holds the ordered list of pie menus

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::menu::{bootstrap_menu, MenuConfig};
use crate::settings::{SettingsError, SettingsStore};

/// Directory name below the platform config dir
pub const APP_DIR: &str = "pie-menu-host";

/// Application settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Theme used by the presentation surface to draw menus
    pub menu_theme: String,
    /// Theme used by the menu editor
    pub editor_theme: String,
    /// Delay before input focus is forced onto a freshly shown surface
    pub refocus_delay_ms: u64,
    /// Log at debug level
    pub debug_logging: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            menu_theme: "default".to_string(),
            editor_theme: "default".to_string(),
            refocus_delay_ms: 100,
            debug_logging: false,
        }
    }
}

impl AppSettings {
    pub const FILE_NAME: &'static str = "settings.json";
}

/// Menu definitions document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSettings {
    pub menus: Vec<MenuConfig>,
}

impl MenuSettings {
    pub const FILE_NAME: &'static str = "menus.json";
}

/// Get the default config directory
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Open the application settings store in `dir`
pub fn open_app_settings(dir: &Path) -> SettingsStore<AppSettings> {
    SettingsStore::open(dir.join(AppSettings::FILE_NAME))
}

/// Open the menu store in `dir`, seeding an example menu on first run
pub fn open_menu_settings(dir: &Path) -> Result<SettingsStore<MenuSettings>, SettingsError> {
    let mut store = SettingsStore::open(dir.join(MenuSettings::FILE_NAME));
    ensure_example_menu(&mut store)?;
    Ok(store)
}

/// Write one generated example menu if the store holds no menus.
///
/// Returns whether a menu was added.
pub fn ensure_example_menu(store: &mut SettingsStore<MenuSettings>) -> Result<bool, SettingsError> {
    let menus: Vec<MenuConfig> = store.get_as("menus")?;
    if !menus.is_empty() {
        return Ok(false);
    }

    tracing::info!("no menus configured, writing example menu");
    store.set_value("menus", vec![bootstrap_menu()])?;
    Ok(true)
}
