//! Persisted user settings.
//!
//! A small JSON record remembering the last-used rate, button, mode,
//! theme and toggle hotkey. Loading is never fatal: a missing or corrupt
//! file falls back to defaults with a logged warning, and an out-of-range
//! rate is clamped rather than rejected.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actuator::{ClickMode, MouseButton};
use crate::error::{RapidClickError, Result};
use crate::hotkey::HotkeyBinding;
use crate::scheduler::{RATE_MAX, RATE_MIN};

/// Default settings file name, resolved against the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "rapidclick.json";

/// The persisted settings record.
///
/// All fields default individually, so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target clicks per second.
    pub rate: u32,
    /// Pointer button to actuate.
    pub button: MouseButton,
    /// Press/release pairs per tick.
    pub mode: ClickMode,
    /// Whether the shell should render its dark theme.
    pub dark_theme: bool,
    /// Key component of the toggle binding, if one is saved.
    pub hotkey_key: Option<String>,
    /// Modifier bitmask of the toggle binding (ctrl=1, alt=2, shift=4,
    /// meta=8).
    pub hotkey_modifiers: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate: 10,
            button: MouseButton::Primary,
            mode: ClickMode::Single,
            dark_theme: false,
            hotkey_key: None,
            hotkey_modifiers: 0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, failing loudly.
    ///
    /// Out-of-range rates are clamped on the way in; a file that does not
    /// parse (including unknown button/mode codes) is an error.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| RapidClickError::settings_load(path, e.to_string()))?;
        let mut settings: Settings = serde_json::from_str(&content)
            .map_err(|e| RapidClickError::settings_load(path, e.to_string()))?;
        settings.clamp_rate();
        Ok(settings)
    }

    /// Load from `path`, falling back to defaults on any failure.
    pub fn load_or_default(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(settings) => {
                debug!("settings loaded from {}", path);
                settings
            }
            Err(e) => {
                if Path::new(path).exists() {
                    warn!("{}; using defaults", e);
                } else {
                    debug!("no settings file at {}; using defaults", path);
                }
                Self::default()
            }
        }
    }

    /// Write the settings as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RapidClickError::settings_save(path, e.to_string()))?;
        fs::write(path, json).map_err(|e| RapidClickError::settings_save(path, e.to_string()))?;
        debug!("settings saved to {}", path);
        Ok(())
    }

    /// Force the rate into the supported range, warning when it moves.
    pub fn clamp_rate(&mut self) {
        let clamped = self.rate.clamp(RATE_MIN, RATE_MAX);
        if clamped != self.rate {
            warn!(
                "click rate {} outside {}..={}; clamped to {}",
                self.rate, RATE_MIN, RATE_MAX, clamped
            );
            self.rate = clamped;
        }
    }

    /// Toggle binding recorded in the settings, if any.
    ///
    /// A saved key that no longer parses is dropped with a warning
    /// instead of failing the load.
    pub fn binding(&self) -> Option<HotkeyBinding> {
        let key = self.hotkey_key.as_deref()?;
        match HotkeyBinding::from_saved(key, self.hotkey_modifiers) {
            Ok(binding) => Some(binding),
            Err(e) => {
                warn!("ignoring saved hotkey: {}", e);
                None
            }
        }
    }

    /// Record `binding` (or none) for the next run.
    pub fn set_binding(&mut self, binding: Option<HotkeyBinding>) {
        match binding {
            Some(binding) => {
                self.hotkey_key = Some(binding.key_name());
                self.hotkey_modifiers = binding.modifier_mask();
            }
            None => {
                self.hotkey_key = None;
                self.hotkey_modifiers = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rate, 10);
        assert_eq!(settings.button, MouseButton::Primary);
        assert_eq!(settings.mode, ClickMode::Single);
        assert!(!settings.dark_theme);
        assert_eq!(settings.hotkey_key, None);
        assert_eq!(settings.hotkey_modifiers, 0);
        assert_eq!(settings.binding(), None);
    }

    #[test]
    fn test_clamp_rate() {
        let mut settings = Settings {
            rate: 5000,
            ..Settings::default()
        };
        settings.clamp_rate();
        assert_eq!(settings.rate, 1000);

        settings.rate = 0;
        settings.clamp_rate();
        assert_eq!(settings.rate, 1);

        settings.rate = 250;
        settings.clamp_rate();
        assert_eq!(settings.rate, 250);
    }

    #[test]
    fn test_binding_round_trip() {
        let mut settings = Settings::default();
        let binding = HotkeyBinding::parse("ctrl+alt+f6").unwrap();

        settings.set_binding(Some(binding));
        assert_eq!(settings.hotkey_key.as_deref(), Some("f6"));
        assert_eq!(settings.hotkey_modifiers, 1 | 2);
        assert_eq!(settings.binding(), Some(binding));

        settings.set_binding(None);
        assert_eq!(settings.hotkey_key, None);
        assert_eq!(settings.hotkey_modifiers, 0);
        assert_eq!(settings.binding(), None);
    }

    #[test]
    fn test_unparseable_saved_hotkey_is_dropped() {
        let settings = Settings {
            hotkey_key: Some("no_such_key".to_string()),
            hotkey_modifiers: 1,
            ..Settings::default()
        };
        assert_eq!(settings.binding(), None);
    }

    #[test]
    fn test_enums_serialize_as_integers() {
        let settings = Settings {
            button: MouseButton::Middle,
            mode: ClickMode::Double,
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"button\":2"));
        assert!(json.contains("\"mode\":1"));
    }
}
