//! Application facade.
//!
//! [`AutoClicker`] owns the scheduler, the hotkey controller and the
//! current settings as one object a UI shell drives. Every settings
//! change is persisted immediately; persistence failures are logged and
//! never interrupt the session.

use global_hotkey::hotkey::{Code, Modifiers};
use tracing::{info, warn};

use crate::actuator::{ClickMode, MouseButton};
use crate::error::Result;
use crate::hotkey::{CaptureState, HotkeyBackend, HotkeyBinding, HotkeyController, KeyOutcome};
use crate::scheduler::{ClickScheduler, SharedActuator};
use crate::settings::Settings;

/// One auto-clicker: current settings, the scheduling engine and the
/// toggle shortcut.
pub struct AutoClicker {
    scheduler: ClickScheduler,
    hotkeys: HotkeyController,
    settings: Settings,
    settings_path: String,
}

impl AutoClicker {
    /// Build a clicker over explicit parts; `settings` usually comes from
    /// [`Settings::load_or_default`] for the same path.
    pub fn new(
        actuator: SharedActuator,
        backend: Box<dyn HotkeyBackend>,
        settings: Settings,
        settings_path: impl Into<String>,
    ) -> Self {
        Self {
            scheduler: ClickScheduler::new(actuator),
            hotkeys: HotkeyController::new(backend),
            settings,
            settings_path: settings_path.into(),
        }
    }

    /// Start clicking if idle, stop if running.
    ///
    /// Starting captures the settings as they are at this instant; later
    /// changes apply from the next start.
    pub async fn start_or_toggle(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.stop().await;
            return;
        }
        if let Err(e) = self
            .scheduler
            .start(self.settings.rate, self.settings.button, self.settings.mode)
        {
            warn!("start skipped: {}", e);
        }
    }

    /// Stop clicking; safe to call while idle.
    pub async fn stop(&mut self) {
        self.scheduler.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Clicks issued since startup.
    pub fn clicks_issued(&self) -> u64 {
        self.scheduler.clicks_issued()
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set the click rate, clamped into the supported range.
    pub fn set_rate(&mut self, rate: u32) {
        self.settings.rate = rate;
        self.settings.clamp_rate();
        self.persist();
    }

    pub fn set_button(&mut self, button: MouseButton) {
        self.settings.button = button;
        self.persist();
    }

    pub fn set_mode(&mut self, mode: ClickMode) {
        self.settings.mode = mode;
        self.persist();
    }

    /// Remember the shell's theme choice; rendering is the shell's job.
    pub fn set_dark_theme(&mut self, dark: bool) {
        self.settings.dark_theme = dark;
        self.persist();
    }

    /// Arm capture: the next focused key-down becomes the binding.
    pub fn begin_hotkey_capture(&mut self) {
        self.hotkeys.begin_capture();
    }

    /// Leave capture without touching the current binding.
    pub fn cancel_hotkey_capture(&mut self) {
        self.hotkeys.cancel_capture();
    }

    pub fn capture_state(&self) -> CaptureState {
        self.hotkeys.capture_state()
    }

    pub fn hotkey_binding(&self) -> Option<HotkeyBinding> {
        self.hotkeys.binding()
    }

    /// Feed a focused key-down through capture and toggle handling.
    ///
    /// While capture is armed the key is consumed and the outcome is
    /// persisted; a refused registration is returned to the caller for a
    /// user-visible warning, with the binding already cleared. Outside of
    /// capture the key toggles clicking when it matches the binding
    /// exactly.
    pub async fn handle_key_down(&mut self, code: Code, modifiers: Modifiers) -> Result<()> {
        match self.hotkeys.handle_key_down(code, modifiers) {
            Ok(KeyOutcome::Ignored) => Ok(()),
            Ok(KeyOutcome::Toggle) => {
                self.start_or_toggle().await;
                Ok(())
            }
            Ok(KeyOutcome::Bound(binding)) => {
                info!("toggle hotkey bound to '{}'", binding);
                self.persist_binding();
                Ok(())
            }
            Ok(KeyOutcome::Cleared) => {
                info!("toggle hotkey cleared");
                self.persist_binding();
                Ok(())
            }
            Err(e) => {
                self.persist_binding();
                Err(e)
            }
        }
    }

    /// Install a binding directly, bypassing capture.
    ///
    /// On refusal the binding stays unset and the cleared state is
    /// persisted.
    pub fn bind_hotkey(&mut self, binding: HotkeyBinding) -> Result<()> {
        let result = self.hotkeys.bind(binding);
        self.persist_binding();
        result
    }

    /// Drop the binding and its OS registration.
    pub fn clear_hotkey(&mut self) {
        self.hotkeys.clear();
        self.persist_binding();
    }

    /// Re-register the binding stored in the settings, if any.
    pub fn restore_hotkey(&mut self) -> Result<()> {
        match self.settings.binding() {
            Some(binding) => self.bind_hotkey(binding),
            None => Ok(()),
        }
    }

    /// React to an OS activation event.
    pub async fn handle_hotkey_event(&mut self, event_id: u32) {
        if self.hotkeys.should_toggle(event_id) {
            self.start_or_toggle().await;
        }
    }

    /// Stop clicking, release the OS registration and save settings.
    ///
    /// The saved binding is kept so the next run restores it; only the
    /// live registration is released.
    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
        self.hotkeys.clear();
        self.persist();
        info!("shut down after {} clicks", self.clicks_issued());
    }

    fn persist_binding(&mut self) {
        self.settings.set_binding(self.hotkeys.binding());
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.settings.save_to_file(&self.settings_path) {
            warn!("{}", e);
        }
    }
}
