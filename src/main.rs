//! rclick: command-line shell around the rapidclick library.
//!
//! Loads settings, applies flag overrides, binds the global toggle
//! hotkey and waits for activations until interrupted.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rapidclick::{
    shared_actuator, spawn_hotkey_pump, AutoClicker, ClickMode, HotkeyBinding, MouseButton,
    Settings, SystemActuator, SystemHotkeys, DEFAULT_SETTINGS_FILE,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ButtonArg {
    /// Left (primary) button
    Left,
    /// Right (secondary) button
    Right,
    /// Middle button
    Middle,
}

impl From<ButtonArg> for MouseButton {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Left => MouseButton::Primary,
            ButtonArg::Right => MouseButton::Secondary,
            ButtonArg::Middle => MouseButton::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// One press/release pair per tick
    Single,
    /// Two press/release pairs per tick
    Double,
}

impl From<ModeArg> for ClickMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Single => ClickMode::Single,
            ModeArg::Double => ClickMode::Double,
        }
    }
}

/// Auto-clicker with a global toggle hotkey.
#[derive(Parser, Debug)]
#[command(name = "rclick", version, about)]
struct Args {
    /// Clicks per second (1-1000, clamped)
    #[arg(short, long)]
    rate: Option<u32>,

    /// Pointer button to click
    #[arg(short, long, value_enum)]
    button: Option<ButtonArg>,

    /// Single or double clicks
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Toggle hotkey chord, e.g. "ctrl+alt+f6"
    #[arg(long)]
    hotkey: Option<String>,

    /// Remove the saved toggle hotkey
    #[arg(long)]
    clear_hotkey: bool,

    /// Start clicking immediately instead of waiting for the hotkey
    #[arg(long)]
    start: bool,

    /// Settings file path
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = Settings::load_or_default(&args.config);
    let backend = SystemHotkeys::new().context("global hotkey subsystem unavailable")?;
    let mut app = AutoClicker::new(
        shared_actuator(SystemActuator::new()),
        Box::new(backend),
        settings,
        args.config.clone(),
    );

    if let Some(rate) = args.rate {
        app.set_rate(rate);
    }
    if let Some(button) = args.button {
        app.set_button(button.into());
    }
    if let Some(mode) = args.mode {
        app.set_mode(mode.into());
    }

    if args.clear_hotkey {
        app.clear_hotkey();
    } else if let Some(chord) = &args.hotkey {
        let binding = HotkeyBinding::parse(chord)?;
        if let Err(e) = app.bind_hotkey(binding) {
            println!("{} {}", "warning:".yellow().bold(), e);
        }
    } else if let Err(e) = app.restore_hotkey() {
        println!("{} {}", "warning:".yellow().bold(), e);
    }

    print_banner(&app);

    if args.start {
        app.start_or_toggle().await;
        report_state(&app);
    }

    let (events_tx, mut events) = mpsc::channel(16);
    let pump = spawn_hotkey_pump(events_tx);

    loop {
        tokio::select! {
            Some(event_id) = events.recv() => {
                let was_running = app.is_running();
                app.handle_hotkey_event(event_id).await;
                if app.is_running() != was_running {
                    report_state(&app);
                }
            }
            _ = signal::ctrl_c() => {
                println!("\n{}", "shutting down".dimmed());
                break;
            }
        }
    }

    app.shutdown().await;
    drop(events);
    if let Err(e) = pump.await {
        debug!("hotkey pump ended abnormally: {}", e);
    }

    println!("{} {} clicks issued", "done.".bold(), app.clicks_issued());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "rapidclick=debug,rclick=debug"
    } else {
        "rapidclick=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_banner(app: &AutoClicker) {
    let settings = app.settings();
    println!("{}", "rapidclick".cyan().bold());
    println!("  rate:   {} clicks/sec", settings.rate.to_string().bold());
    println!("  button: {}", settings.button);
    println!("  mode:   {}", settings.mode);
    match app.hotkey_binding() {
        Some(binding) => {
            println!("  hotkey: {} (press to toggle)", binding.to_string().bold());
        }
        None => {
            println!(
                "  hotkey: {} (set one with --hotkey, or use --start)",
                "unset".dimmed()
            );
        }
    }
    println!();
}

fn report_state(app: &AutoClicker) {
    if app.is_running() {
        println!("{}", "clicking started".green());
    } else {
        println!(
            "{} ({} clicks so far)",
            "clicking stopped".red(),
            app.clicks_issued()
        );
    }
}
