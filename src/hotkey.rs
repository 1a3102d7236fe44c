//! Global hotkey capture, registration and activation.
//!
//! The capture/rebind state machine is platform-independent and talks to
//! the OS through the [`HotkeyBackend`] trait, so tests drive it with
//! fakes. [`SystemHotkeys`] is the real backend; activation events are
//! pumped from the OS event stream into a tokio channel by
//! [`spawn_hotkey_pump`].

use std::fmt;
use std::time::Duration;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RapidClickError, Result};

/// Modifier bits used when persisting a binding.
const MASK_CTRL: u32 = 1;
const MASK_ALT: u32 = 2;
const MASK_SHIFT: u32 = 4;
const MASK_META: u32 = 8;

/// Poll interval for the OS hotkey event stream.
const PUMP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A toggle shortcut: one key plus the modifiers held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub code: Code,
    pub modifiers: Modifiers,
}

impl HotkeyBinding {
    pub fn new(code: Code, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Parse a chord such as `"ctrl+alt+f6"`.
    ///
    /// Accepts the modifier names `ctrl`/`control`, `alt`, `shift` and
    /// `meta`/`cmd`/`super` plus exactly one key, case-insensitively.
    pub fn parse(chord: &str) -> Result<Self> {
        let lowered = chord.to_lowercase();
        let parts: Vec<&str> = lowered.split('+').map(|part| part.trim()).collect();

        let mut modifiers = Modifiers::empty();
        let mut code = None;

        for part in &parts {
            match *part {
                "" => return Err(RapidClickError::invalid_chord(chord, "empty component")),
                "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
                "alt" => modifiers |= Modifiers::ALT,
                "shift" => modifiers |= Modifiers::SHIFT,
                "meta" | "cmd" | "super" => modifiers |= Modifiers::SUPER,
                key => {
                    if code.is_some() {
                        return Err(RapidClickError::invalid_chord(
                            chord,
                            "more than one key specified",
                        ));
                    }
                    code = Some(parse_key_code(key)?);
                }
            }
        }

        let code =
            code.ok_or_else(|| RapidClickError::invalid_chord(chord, "no key specified"))?;
        Ok(Self { code, modifiers })
    }

    /// Rebuild a binding from its persisted key name and modifier mask.
    pub fn from_saved(key: &str, mask: u32) -> Result<Self> {
        let code = parse_key_code(key)?;
        let mut modifiers = Modifiers::empty();
        if mask & MASK_CTRL != 0 {
            modifiers |= Modifiers::CONTROL;
        }
        if mask & MASK_ALT != 0 {
            modifiers |= Modifiers::ALT;
        }
        if mask & MASK_SHIFT != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        if mask & MASK_META != 0 {
            modifiers |= Modifiers::SUPER;
        }
        Ok(Self { code, modifiers })
    }

    /// OS-facing hotkey value for registration and event matching.
    pub fn hotkey(&self) -> HotKey {
        HotKey::new(Some(self.modifiers), self.code)
    }

    /// Identifier the OS event stream reports activations under.
    pub fn id(&self) -> u32 {
        self.hotkey().id()
    }

    /// Persisted name of the key component.
    pub fn key_name(&self) -> String {
        key_code_name(self.code)
    }

    /// Pack the modifiers into the persisted bitmask.
    pub fn modifier_mask(&self) -> u32 {
        let mut mask = 0;
        if self.modifiers.contains(Modifiers::CONTROL) {
            mask |= MASK_CTRL;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            mask |= MASK_ALT;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            mask |= MASK_SHIFT;
        }
        if self.modifiers.contains(Modifiers::SUPER) {
            mask |= MASK_META;
        }
        mask
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CONTROL, "ctrl"),
            (Modifiers::ALT, "alt"),
            (Modifiers::SHIFT, "shift"),
            (Modifiers::SUPER, "meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", key_code_name(self.code))
    }
}

/// Capture workflow state for rebinding the toggle shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Key events keep their normal meaning.
    #[default]
    Idle,
    /// The next key-down is consumed as the new binding.
    AwaitingKey,
}

/// What a focused key-down meant to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not addressed to the clicker.
    Ignored,
    /// The key matched the binding; the caller should toggle.
    Toggle,
    /// Capture consumed the key and committed a new binding.
    Bound(HotkeyBinding),
    /// Capture consumed Escape and removed the binding.
    Cleared,
}

/// OS registration surface.
///
/// Separated from the state machine so tests can observe and refuse
/// registrations without touching the real OS hook.
pub trait HotkeyBackend: Send {
    /// Request a system-wide registration; `false` means the chord is
    /// already claimed or was rejected.
    fn register(&mut self, hotkey: HotKey) -> bool;

    /// Release an earlier registration. Must tolerate hotkeys that were
    /// never registered.
    fn unregister(&mut self, hotkey: HotKey);
}

/// [`HotkeyBackend`] backed by the process-wide OS hotkey manager.
pub struct SystemHotkeys {
    manager: GlobalHotKeyManager,
}

impl SystemHotkeys {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| RapidClickError::hotkey(format!("hotkey manager unavailable: {e}")))?;
        Ok(Self { manager })
    }
}

impl HotkeyBackend for SystemHotkeys {
    fn register(&mut self, hotkey: HotKey) -> bool {
        match self.manager.register(hotkey) {
            Ok(()) => true,
            Err(e) => {
                warn!("hotkey registration refused: {}", e);
                false
            }
        }
    }

    fn unregister(&mut self, hotkey: HotKey) {
        if let Err(e) = self.manager.unregister(hotkey) {
            debug!("hotkey unregister failed: {}", e);
        }
    }
}

/// Drives the capture/registration state machine over a backend.
///
/// At most one OS registration is outstanding: every path that changes
/// the binding releases the old registration first, and dropping the
/// controller releases whatever is still registered.
pub struct HotkeyController {
    backend: Box<dyn HotkeyBackend>,
    binding: Option<HotkeyBinding>,
    capture: CaptureState,
}

impl HotkeyController {
    pub fn new(backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            binding: None,
            capture: CaptureState::Idle,
        }
    }

    pub fn binding(&self) -> Option<HotkeyBinding> {
        self.binding
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture
    }

    /// Arm capture: the next key-down fed in becomes the binding.
    pub fn begin_capture(&mut self) {
        self.capture = CaptureState::AwaitingKey;
        debug!("hotkey capture armed");
    }

    /// Leave capture without touching the current binding.
    pub fn cancel_capture(&mut self) {
        if self.capture == CaptureState::AwaitingKey {
            self.capture = CaptureState::Idle;
            debug!("hotkey capture cancelled");
        }
    }

    /// Install `binding`, replacing any current one.
    ///
    /// The old registration is released first. On refusal the binding is
    /// left unset so a chord that failed to register is never claimed.
    pub fn bind(&mut self, binding: HotkeyBinding) -> Result<()> {
        self.release();
        if self.backend.register(binding.hotkey()) {
            info!("global hotkey '{}' registered", binding);
            self.binding = Some(binding);
            Ok(())
        } else {
            Err(RapidClickError::hotkey_registration_failed(
                binding.to_string(),
                "the system refused the registration",
            ))
        }
    }

    /// Remove the binding and release its OS registration.
    pub fn clear(&mut self) {
        self.release();
    }

    /// Feed a focused key-down through the capture/toggle logic.
    ///
    /// While capture is armed the key is consumed: Escape clears the
    /// binding, anything else becomes the new binding together with the
    /// modifiers held at that moment. Otherwise the key toggles exactly
    /// when both the key and the modifier set match the binding.
    pub fn handle_key_down(&mut self, code: Code, modifiers: Modifiers) -> Result<KeyOutcome> {
        match self.capture {
            CaptureState::AwaitingKey => {
                self.capture = CaptureState::Idle;
                if code == Code::Escape {
                    self.clear();
                    return Ok(KeyOutcome::Cleared);
                }
                let binding = HotkeyBinding::new(code, modifiers);
                self.bind(binding)?;
                Ok(KeyOutcome::Bound(binding))
            }
            CaptureState::Idle => match self.binding {
                Some(binding) if binding.code == code && binding.modifiers == modifiers => {
                    Ok(KeyOutcome::Toggle)
                }
                _ => Ok(KeyOutcome::Ignored),
            },
        }
    }

    /// Whether an OS activation event with `event_id` should toggle
    /// clicking. Activations are ignored while capture is armed; the
    /// focused key-down is the capture gesture.
    pub fn should_toggle(&self, event_id: u32) -> bool {
        self.capture == CaptureState::Idle
            && self.binding.is_some_and(|binding| binding.id() == event_id)
    }

    fn release(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.backend.unregister(binding.hotkey());
            debug!("global hotkey '{}' released", binding);
        }
    }
}

impl Drop for HotkeyController {
    fn drop(&mut self) {
        self.release();
    }
}

/// Forward OS hotkey activations into a channel tokio tasks can await.
///
/// The OS stream has no async integration, so a blocking task polls it.
/// The pump exits once the receiving side of `events` is gone.
pub fn spawn_hotkey_pump(events: mpsc::Sender<u32>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let receiver = GlobalHotKeyEvent::receiver();
        loop {
            if events.is_closed() {
                break;
            }
            if let Ok(event) = receiver.try_recv() {
                if event.state == HotKeyState::Pressed && events.blocking_send(event.id).is_err() {
                    break;
                }
            }
            // Small sleep to prevent busy waiting
            std::thread::sleep(PUMP_POLL_INTERVAL);
        }
        debug!("hotkey pump stopped");
    })
}

fn parse_key_code(key: &str) -> Result<Code> {
    let code = match key {
        // Letters
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,

        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Function keys
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,

        // Special keys
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,

        // Arrow keys
        "up" | "arrowup" => Code::ArrowUp,
        "down" | "arrowdown" => Code::ArrowDown,
        "left" | "arrowleft" => Code::ArrowLeft,
        "right" | "arrowright" => Code::ArrowRight,

        _ => return Err(RapidClickError::invalid_key(key, "unsupported key")),
    };

    Ok(code)
}

/// Friendly name for a key code, matching what [`HotkeyBinding::parse`]
/// accepts. Codes outside the supported set fall back to their debug
/// name and will not survive a settings round trip.
fn key_code_name(code: Code) -> String {
    let name = match code {
        // Letters
        Code::KeyA => "a",
        Code::KeyB => "b",
        Code::KeyC => "c",
        Code::KeyD => "d",
        Code::KeyE => "e",
        Code::KeyF => "f",
        Code::KeyG => "g",
        Code::KeyH => "h",
        Code::KeyI => "i",
        Code::KeyJ => "j",
        Code::KeyK => "k",
        Code::KeyL => "l",
        Code::KeyM => "m",
        Code::KeyN => "n",
        Code::KeyO => "o",
        Code::KeyP => "p",
        Code::KeyQ => "q",
        Code::KeyR => "r",
        Code::KeyS => "s",
        Code::KeyT => "t",
        Code::KeyU => "u",
        Code::KeyV => "v",
        Code::KeyW => "w",
        Code::KeyX => "x",
        Code::KeyY => "y",
        Code::KeyZ => "z",

        // Numbers
        Code::Digit0 => "0",
        Code::Digit1 => "1",
        Code::Digit2 => "2",
        Code::Digit3 => "3",
        Code::Digit4 => "4",
        Code::Digit5 => "5",
        Code::Digit6 => "6",
        Code::Digit7 => "7",
        Code::Digit8 => "8",
        Code::Digit9 => "9",

        // Function keys
        Code::F1 => "f1",
        Code::F2 => "f2",
        Code::F3 => "f3",
        Code::F4 => "f4",
        Code::F5 => "f5",
        Code::F6 => "f6",
        Code::F7 => "f7",
        Code::F8 => "f8",
        Code::F9 => "f9",
        Code::F10 => "f10",
        Code::F11 => "f11",
        Code::F12 => "f12",

        // Special keys
        Code::Space => "space",
        Code::Enter => "enter",
        Code::Tab => "tab",
        Code::Escape => "escape",
        Code::Backspace => "backspace",
        Code::Delete => "delete",
        Code::Insert => "insert",
        Code::Home => "home",
        Code::End => "end",
        Code::PageUp => "pageup",
        Code::PageDown => "pagedown",

        // Arrow keys
        Code::ArrowUp => "up",
        Code::ArrowDown => "down",
        Code::ArrowLeft => "left",
        Code::ArrowRight => "right",

        other => return format!("{other:?}").to_lowercase(),
    };

    name.to_string()
}
