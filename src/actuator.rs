//! Synthetic pointer-button actuation.
//!
//! This module defines the button/mode domain types and the [`Actuator`]
//! seam the scheduler clicks through. The system implementation injects
//! events at the current pointer position; failures are logged and
//! swallowed so a running session is never interrupted by a transient
//! OS refusal.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RapidClickError, Result};

/// Pointer button to actuate.
///
/// Persisted as a small integer (0 = primary, 1 = secondary, 2 = middle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

impl From<MouseButton> for u8 {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Primary => 0,
            MouseButton::Secondary => 1,
            MouseButton::Middle => 2,
        }
    }
}

impl TryFrom<u8> for MouseButton {
    type Error = RapidClickError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Primary),
            1 => Ok(Self::Secondary),
            2 => Ok(Self::Middle),
            other => Err(RapidClickError::UnknownButton(other)),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Primary => "primary",
            MouseButton::Secondary => "secondary",
            MouseButton::Middle => "middle",
        };
        write!(f, "{name}")
    }
}

/// How many press/release pairs each scheduled tick produces.
///
/// Persisted as a small integer (0 = single, 1 = double).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClickMode {
    Single,
    Double,
}

impl ClickMode {
    /// Press/release pairs issued per tick.
    pub fn pairs(self) -> u32 {
        match self {
            ClickMode::Single => 1,
            ClickMode::Double => 2,
        }
    }
}

impl From<ClickMode> for u8 {
    fn from(mode: ClickMode) -> Self {
        match mode {
            ClickMode::Single => 0,
            ClickMode::Double => 1,
        }
    }
}

impl TryFrom<u8> for ClickMode {
    type Error = RapidClickError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Single),
            1 => Ok(Self::Double),
            other => Err(RapidClickError::UnknownMode(other)),
        }
    }
}

impl fmt::Display for ClickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClickMode::Single => "single",
            ClickMode::Double => "double",
        };
        write!(f, "{name}")
    }
}

/// Delivers synthetic button events to the operating system.
///
/// The scheduler drives one implementation through a shared mutex, one
/// call per scheduled tick. Calls are fire-and-forget: implementations
/// log failures and never propagate them into a running session.
pub trait Actuator: Send {
    /// Press and release `button` at the current pointer position.
    ///
    /// `ClickMode::Double` issues two press/release pairs back to back.
    /// The pointer position is sampled once per call.
    fn click(&mut self, button: MouseButton, mode: ClickMode);
}

/// Actuator backed by the native input-injection API.
///
/// On non-Windows targets injection is a traced no-op so the scheduling
/// and hotkey layers stay usable and testable everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemActuator;

impl SystemActuator {
    pub fn new() -> Self {
        Self
    }
}

impl Actuator for SystemActuator {
    fn click(&mut self, button: MouseButton, mode: ClickMode) {
        if let Err(e) = send_click(button, mode) {
            debug!("dropped {} {} click: {}", mode, button, e);
        }
    }
}

#[cfg(windows)]
fn send_click(button: MouseButton, mode: ClickMode) -> Result<()> {
    use std::mem;
    use winapi::shared::windef::POINT;
    use winapi::um::winuser::{
        GetCursorPos, SendInput, INPUT, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
        MOUSEINPUT,
    };

    let (down, up) = match button {
        MouseButton::Primary => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
        MouseButton::Secondary => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
        MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
    };

    // Coordinates are sampled once, before the whole batch.
    let mut point = POINT { x: 0, y: 0 };
    if unsafe { GetCursorPos(&mut point) } == 0 {
        return Err(RapidClickError::actuation("GetCursorPos failed"));
    }

    let mut inputs: Vec<INPUT> = Vec::with_capacity(mode.pairs() as usize * 2);
    for _ in 0..mode.pairs() {
        for flag in [down, up] {
            let mut input: INPUT = unsafe { mem::zeroed() };
            input.type_ = INPUT_MOUSE;
            unsafe {
                *input.u.mi_mut() = MOUSEINPUT {
                    dx: point.x,
                    dy: point.y,
                    mouseData: 0,
                    dwFlags: flag,
                    time: 0,
                    dwExtraInfo: 0,
                };
            }
            inputs.push(input);
        }
    }

    let sent = unsafe {
        SendInput(
            inputs.len() as u32,
            inputs.as_mut_ptr(),
            mem::size_of::<INPUT>() as i32,
        )
    };
    if sent != inputs.len() as u32 {
        return Err(RapidClickError::actuation(format!(
            "SendInput delivered {} of {} events",
            sent,
            inputs.len()
        )));
    }

    Ok(())
}

#[cfg(not(windows))]
fn send_click(button: MouseButton, mode: ClickMode) -> Result<()> {
    use tracing::trace;

    trace!("no input backend on this platform; {} {} click skipped", mode, button);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_codes_round_trip() {
        for button in [MouseButton::Primary, MouseButton::Secondary, MouseButton::Middle] {
            let code = u8::from(button);
            assert_eq!(MouseButton::try_from(code).unwrap(), button);
        }
        assert_eq!(u8::from(MouseButton::Primary), 0);
        assert_eq!(u8::from(MouseButton::Secondary), 1);
        assert_eq!(u8::from(MouseButton::Middle), 2);
    }

    #[test]
    fn test_mode_codes_round_trip() {
        assert_eq!(u8::from(ClickMode::Single), 0);
        assert_eq!(u8::from(ClickMode::Double), 1);
        assert_eq!(ClickMode::try_from(0).unwrap(), ClickMode::Single);
        assert_eq!(ClickMode::try_from(1).unwrap(), ClickMode::Double);
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        assert!(matches!(
            MouseButton::try_from(3),
            Err(RapidClickError::UnknownButton(3))
        ));
        assert!(matches!(
            ClickMode::try_from(2),
            Err(RapidClickError::UnknownMode(2))
        ));
    }

    #[test]
    fn test_pairs_per_mode() {
        assert_eq!(ClickMode::Single.pairs(), 1);
        assert_eq!(ClickMode::Double.pairs(), 2);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(MouseButton::Primary.to_string(), "primary");
        assert_eq!(MouseButton::Middle.to_string(), "middle");
        assert_eq!(ClickMode::Double.to_string(), "double");
    }
}
