//! Custom error types for rapidclick.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for rapidclick operations.
#[derive(Error, Debug)]
pub enum RapidClickError {
    /// The requested click rate is outside the supported range.
    #[error("invalid click rate {rate}: must be between {min} and {max} clicks per second")]
    InvalidRate { rate: u32, min: u32, max: u32 },

    /// Start was requested while a clicking session is already active.
    #[error("clicker is already running")]
    AlreadyRunning,

    /// The operating system refused a global hotkey registration.
    #[error("failed to register global hotkey '{chord}': {reason}")]
    HotkeyRegistrationFailed { chord: String, reason: String },

    /// Error parsing a hotkey chord string.
    #[error("invalid hotkey '{chord}': {reason}")]
    InvalidChord { chord: String, reason: String },

    /// The specified key is invalid or unsupported.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A persisted mouse-button code is not recognized.
    #[error("unknown mouse button code {0}")]
    UnknownButton(u8),

    /// A persisted click-mode code is not recognized.
    #[error("unknown click mode code {0}")]
    UnknownMode(u8),

    /// Error from the OS hotkey subsystem.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// A synthetic click could not be delivered to the OS input queue.
    #[error("click injection failed: {0}")]
    Actuation(String),

    /// Error reading or parsing the settings file.
    #[error("failed to load settings from '{path}': {reason}")]
    SettingsLoad { path: String, reason: String },

    /// Error writing the settings file.
    #[error("failed to save settings to '{path}': {reason}")]
    SettingsSave { path: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rapidclick operations.
pub type Result<T> = std::result::Result<T, RapidClickError>;

impl RapidClickError {
    /// Create a new InvalidRate error.
    pub fn invalid_rate(rate: u32, min: u32, max: u32) -> Self {
        Self::InvalidRate { rate, min, max }
    }

    /// Create a new HotkeyRegistrationFailed error.
    pub fn hotkey_registration_failed(
        chord: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::HotkeyRegistrationFailed {
            chord: chord.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidChord error.
    pub fn invalid_chord(chord: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChord {
            chord: chord.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Hotkey error.
    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    /// Create a new Actuation error.
    pub fn actuation(message: impl Into<String>) -> Self {
        Self::Actuation(message.into())
    }

    /// Create a new SettingsLoad error.
    pub fn settings_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SettingsLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new SettingsSave error.
    pub fn settings_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SettingsSave {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
