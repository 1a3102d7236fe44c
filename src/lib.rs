//! # rapidclick
//!
//! A cross-platform auto-clicker with a global toggle hotkey and an
//! adjustable click rate.
//!
//! ## Features
//!
//! - Click rates from 1 to 1000 clicks per second
//! - High rates sharded across parallel emitter timers
//! - Single and double click modes for any pointer button
//! - Global toggle hotkey that works while the app is unfocused
//! - Capture workflow for rebinding the hotkey from a key press
//! - JSON settings persisted between runs
//!
//! ## Example
//!
//! ```no_run
//! use rapidclick::{
//!     shared_actuator, AutoClicker, Settings, SystemActuator, SystemHotkeys,
//! };
//!
//! # async fn run() -> rapidclick::Result<()> {
//! let settings = Settings::load_or_default("rapidclick.json");
//! let backend = SystemHotkeys::new()?;
//! let mut app = AutoClicker::new(
//!     shared_actuator(SystemActuator::new()),
//!     Box::new(backend),
//!     settings,
//!     "rapidclick.json",
//! );
//!
//! app.set_rate(25);
//! app.start_or_toggle().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Settings are stored as JSON:
//!
//! ```json
//! {
//!   "rate": 25,
//!   "button": 0,
//!   "mode": 0,
//!   "dark_theme": false,
//!   "hotkey_key": "f6",
//!   "hotkey_modifiers": 1
//! }
//! ```

pub mod actuator;
pub mod app;
pub mod error;
pub mod hotkey;
pub mod scheduler;
pub mod settings;

pub use actuator::{Actuator, ClickMode, MouseButton, SystemActuator};
pub use app::AutoClicker;
pub use error::{RapidClickError, Result};
pub use hotkey::{
    spawn_hotkey_pump, CaptureState, HotkeyBackend, HotkeyBinding, HotkeyController, SystemHotkeys,
};
pub use scheduler::{
    shared_actuator, ClickScheduler, SharedActuator, TimerPlan, EMITTER_MAX_RATE, RATE_MAX,
    RATE_MIN,
};
pub use settings::{Settings, DEFAULT_SETTINGS_FILE};
