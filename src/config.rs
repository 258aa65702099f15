//! Configuration system for ringwm
//!
//! Loads configuration from TOML file at `~/.config/ringwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::wm::keyboard::{Action, KeyBinding, Modifiers, keysym_from_name};
use crate::wm::layout::Mode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one desktop is required")]
    NoDesktops,
    #[error("desktop index {index} out of range (have {count} desktops) in {context}")]
    DesktopOutOfRange {
        index: usize,
        count: usize,
        context: String,
    },
    #[error("master fraction must be between 0 and 1, got {0}")]
    MasterFraction(f32),
    #[error("layout mode `{0}` is not supported")]
    UnsupportedMode(Mode),
    #[error("invalid colour `{0}`, expected #rrggbb")]
    Color(String),
    #[error("unknown key name `{0}`")]
    UnknownKey(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("spawn binding for `{0}` has an empty command")]
    EmptyCommand(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub panel: PanelConfig,
    pub border: BorderConfig,
    pub focus: FocusConfig,
    pub rules: Vec<AppRule>,
    pub keys: Vec<KeyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            panel: PanelConfig::default(),
            border: BorderConfig::default(),
            focus: FocusConfig::default(),
            rules: default_rules(),
            keys: default_keys(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {:?}", config_path))?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("ringwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string =
            toml::to_string_pretty(&default_config).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Reject settings the manager cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.general.desktops;
        if count == 0 {
            return Err(ConfigError::NoDesktops);
        }
        check_desktop(self.general.default_desktop, count, "general.default_desktop")?;

        if self.general.default_mode == Mode::Float {
            return Err(ConfigError::UnsupportedMode(Mode::Float));
        }
        let fraction = self.general.master_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::MasterFraction(fraction));
        }

        Rgb::parse(&self.border.focus)?;
        Rgb::parse(&self.border.unfocus)?;

        for rule in &self.rules {
            if let Some(desktop) = rule.desktop {
                check_desktop(desktop, count, &format!("rule for `{}`", rule.class))?;
            }
        }

        for key in &self.keys {
            key.resolve()?;
            match &key.action {
                Action::ChangeDesktop(i) | Action::ClientToDesktop(i) => {
                    check_desktop(*i, count, &format!("binding for `{}`", key.key))?;
                }
                Action::SwitchMode(Mode::Float) => {
                    return Err(ConfigError::UnsupportedMode(Mode::Float));
                }
                Action::Spawn(argv) if argv.is_empty() => {
                    return Err(ConfigError::EmptyCommand(key.key.clone()));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Resolved key bindings
    pub fn key_bindings(&self) -> Result<Vec<KeyBinding>, ConfigError> {
        self.keys.iter().map(KeyConfig::resolve).collect()
    }

    /// First rule matching a window's class or instance name
    pub fn rule_for(&self, class: Option<&str>, instance: Option<&str>) -> Option<&AppRule> {
        self.rules
            .iter()
            .find(|rule| Some(rule.class.as_str()) == class || Some(rule.class.as_str()) == instance)
    }
}

fn check_desktop(index: usize, count: usize, context: &str) -> Result<(), ConfigError> {
    if index < count {
        Ok(())
    } else {
        Err(ConfigError::DesktopOutOfRange {
            index,
            count,
            context: context.to_string(),
        })
    }
}

/// Desktop and tiling behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Number of desktops
    pub desktops: usize,
    /// Desktop shown at startup
    pub default_desktop: usize,
    /// Initial layout of every desktop
    pub default_mode: Mode,
    /// Master area share of the screen (0..1)
    pub master_fraction: f32,
    /// New windows go to the end of the stack instead of becoming master
    pub attach_aside: bool,
    /// Follow a window sent to another desktop
    pub follow_window: bool,
    /// Master and stack never shrink below this many pixels
    pub min_window_size: i32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            desktops: 4,
            default_desktop: 0,
            default_mode: Mode::Tile,
            master_fraction: 0.52,
            attach_aside: true,
            follow_window: false,
            min_window_size: 50,
        }
    }
}

/// Space reserved for an external panel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Reserve panel space by default
    pub show: bool,
    /// Panel at the top of the screen (bottom otherwise)
    pub top: bool,
    /// Panel height in pixels
    pub height: i32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            show: true,
            top: true,
            height: 18,
        }
    }
}

/// Window border configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    /// Border width in pixels
    pub width: u16,
    /// Focused window border colour (#rrggbb)
    pub focus: String,
    /// Unfocused window border colour (#rrggbb)
    pub unfocus: String,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: 2,
            focus: "#ff950e".to_string(),
            unfocus: "#444444".to_string(),
        }
    }
}

/// Pointer focus policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Focus an unfocused window when clicked
    pub click_to_focus: bool,
    /// Button used for click-to-focus
    pub focus_button: u8,
    /// Focus the window the pointer enters
    pub follow_mouse: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            click_to_focus: true,
            focus_button: 1,
            follow_mouse: false,
        }
    }
}

/// Placement rule applied when a window is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRule {
    /// WM_CLASS class or instance name
    pub class: String,
    /// Target desktop, the active one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<usize>,
    /// Switch to the target desktop right away
    #[serde(default)]
    pub follow: bool,
    /// Floating placement; not supported, windows are tiled
    #[serde(default)]
    pub float: bool,
}

/// Key binding as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub key: String,
    pub action: Action,
}

impl KeyConfig {
    fn new(modifiers: &[&str], key: &str, action: Action) -> Self {
        Self {
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            key: key.to_string(),
            action,
        }
    }

    pub fn resolve(&self) -> Result<KeyBinding, ConfigError> {
        let modifiers = self.modifiers.iter().try_fold(Modifiers::empty(), |acc, name| {
            Modifiers::parse_name(name)
                .map(|m| acc | m)
                .ok_or_else(|| ConfigError::UnknownModifier(name.clone()))
        })?;
        let keysym =
            keysym_from_name(&self.key).ok_or_else(|| ConfigError::UnknownKey(self.key.clone()))?;

        Ok(KeyBinding {
            modifiers,
            keysym,
            action: self.action.clone(),
        })
    }
}

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb`
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let err = || ConfigError::Color(text.to_string());
        let hex = text.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

fn default_rules() -> Vec<AppRule> {
    vec![
        AppRule {
            class: "MPlayer".to_string(),
            desktop: Some(3),
            follow: true,
            float: false,
        },
        AppRule {
            class: "Gimp".to_string(),
            desktop: Some(0),
            follow: false,
            float: true,
        },
    ]
}

fn default_keys() -> Vec<KeyConfig> {
    const SUPER: &[&str] = &["super"];
    const SUPER_SHIFT: &[&str] = &["super", "shift"];
    const SUPER_CTRL: &[&str] = &["super", "control"];

    let mut keys = vec![
        KeyConfig::new(SUPER, "b", Action::TogglePanel),
        KeyConfig::new(SUPER, "BackSpace", Action::FocusUrgent),
        KeyConfig::new(SUPER_SHIFT, "c", Action::KillClient),
        KeyConfig::new(SUPER, "j", Action::NextWindow),
        KeyConfig::new(SUPER, "k", Action::PrevWindow),
        KeyConfig::new(SUPER, "h", Action::ResizeMaster(-10)),
        KeyConfig::new(SUPER, "l", Action::ResizeMaster(10)),
        KeyConfig::new(SUPER, "o", Action::ResizeStack(-10)),
        KeyConfig::new(SUPER, "q", Action::ResizeStack(10)),
        KeyConfig::new(SUPER_CTRL, "h", Action::RotateDesktop(-1)),
        KeyConfig::new(SUPER_CTRL, "l", Action::RotateDesktop(1)),
        KeyConfig::new(SUPER_SHIFT, "h", Action::RotateFilled(-1)),
        KeyConfig::new(SUPER_SHIFT, "l", Action::RotateFilled(1)),
        KeyConfig::new(SUPER, "Tab", Action::LastDesktop),
        KeyConfig::new(SUPER_SHIFT, "Return", Action::SwapMaster),
        KeyConfig::new(SUPER_SHIFT, "j", Action::MoveDown),
        KeyConfig::new(SUPER_SHIFT, "k", Action::MoveUp),
        KeyConfig::new(SUPER_SHIFT, "t", Action::SwitchMode(Mode::Tile)),
        KeyConfig::new(SUPER_SHIFT, "m", Action::SwitchMode(Mode::Monocle)),
        KeyConfig::new(SUPER_SHIFT, "b", Action::SwitchMode(Mode::Bstack)),
        KeyConfig::new(SUPER_SHIFT, "g", Action::SwitchMode(Mode::Grid)),
        KeyConfig::new(SUPER_CTRL, "r", Action::Quit(0)),
        KeyConfig::new(SUPER_CTRL, "q", Action::Quit(1)),
        KeyConfig::new(SUPER, "Return", Action::Spawn(vec!["st".to_string()])),
        KeyConfig::new(SUPER, "p", Action::Spawn(vec!["dmenu_run".to_string()])),
    ];

    for (desktop, key) in ["F1", "F2", "F3", "F4"].into_iter().enumerate() {
        keys.push(KeyConfig::new(SUPER, key, Action::ChangeDesktop(desktop)));
        keys.push(KeyConfig::new(SUPER_SHIFT, key, Action::ClientToDesktop(desktop)));
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.general.desktops, 4);
        assert_eq!(config.general.default_mode, Mode::Tile);
        assert_eq!(config.key_bindings().unwrap().len(), config.keys.len());
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.keys.len(), Config::default().keys.len());
        assert_eq!(parsed.rules.len(), 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml_str(
            r##"
            [general]
            desktops = 6
            default_mode = "grid"

            [border]
            focus = "#00ff00"
            "##,
        )
        .unwrap();

        assert_eq!(config.general.desktops, 6);
        assert_eq!(config.general.default_mode, Mode::Grid);
        assert_eq!(config.general.master_fraction, 0.52);
        assert_eq!(config.border.unfocus, "#444444");
        assert_eq!(config.panel.height, 18);
    }

    #[test]
    fn test_float_mode_rejected() {
        let err = Config::from_toml_str(
            r#"
            [general]
            default_mode = "float"
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("not supported"));

        let mut config = Config::default();
        config
            .keys
            .push(KeyConfig::new(&["super", "shift"], "f", Action::SwitchMode(Mode::Float)));
        assert_eq!(config.validate(), Err(ConfigError::UnsupportedMode(Mode::Float)));
    }

    #[test]
    fn test_out_of_range_desktop_rejected() {
        let mut config = Config::default();
        config.general.desktops = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DesktopOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_key_table_parses_actions() {
        let config = Config::from_toml_str(
            r#"
            rules = []

            [[keys]]
            modifiers = ["super"]
            key = "F2"
            action = { change_desktop = 1 }

            [[keys]]
            modifiers = ["alt", "shift"]
            key = "Return"
            action = { spawn = ["xterm", "-e", "top"] }

            [[keys]]
            modifiers = ["super"]
            key = "j"
            action = "next_window"
            "#,
        )
        .unwrap();

        let bindings = config.key_bindings().unwrap();
        assert_eq!(bindings[0].action, Action::ChangeDesktop(1));
        assert_eq!(bindings[0].keysym, 0xffbf);
        assert_eq!(bindings[1].modifiers, Modifiers::MOD1 | Modifiers::SHIFT);
        assert_eq!(
            bindings[1].action,
            Action::Spawn(vec!["xterm".into(), "-e".into(), "top".into()])
        );
        assert_eq!(bindings[2].action, Action::NextWindow);
    }

    #[test]
    fn test_bad_key_name_rejected() {
        let mut config = Config::default();
        config.keys = vec![KeyConfig::new(&["super"], "Hyper_L", Action::NextWindow)];
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownKey("Hyper_L".to_string()))
        );
    }

    #[test]
    fn test_colour_parsing() {
        assert_eq!(
            Rgb::parse("#ff950e").unwrap(),
            Rgb {
                r: 0xff,
                g: 0x95,
                b: 0x0e
            }
        );
        assert!(Rgb::parse("ff950e").is_err());
        assert!(Rgb::parse("#ff95").is_err());
        assert!(Rgb::parse("#gg950e").is_err());
    }

    #[test]
    fn test_rule_lookup_matches_class_or_instance() {
        let config = Config::default();
        assert_eq!(
            config.rule_for(Some("MPlayer"), None).and_then(|r| r.desktop),
            Some(3)
        );
        assert_eq!(
            config.rule_for(Some("other"), Some("Gimp")).and_then(|r| r.desktop),
            Some(0)
        );
        assert!(config.rule_for(Some("xterm"), Some("xterm")).is_none());
    }
}
