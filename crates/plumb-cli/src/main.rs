//! `plumb` – spirit level in the terminal.
//!
//! This binary wires the level pipeline to a terminal host.  It:
//!
//! 1. Checks for `~/.plumb/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Asks for motion-sensor access.  A refusal is final for the session.
//! 3. Spawns the frame loop and a simulated tilt sensor on a Tokio runtime.
//! 4. Drops the user into an **interactive REPL** (`/tilt`, `/mode`,
//!    `/hold`, `/calibrate`, `/cache`, …).
//! 5. Intercepts **Ctrl-C** to stop the frame loop and exit cleanly.

mod config;
mod device;
mod repl;
mod terminal;

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use plumb_cache::{AssetCache, DirFetcher};
use plumb_middleware::{ChannelSensor, EventBus, Topic};
use plumb_runtime::{Command, FrameLoop, SessionController};
use plumb_types::{Event, EventPayload, LevelError, RawSample};
use tokio::sync::watch;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG filters (default "info"); PLUMB_LOG_FORMAT=json switches to
    // newline-delimited JSON.  Logs go to stderr, the level to stdout.
    let _otel_guard = plumb_runtime::init_tracing("plumb");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let session_config = match cfg.session_config() {
        Ok(s) => s,
        Err(e) => {
            println!("{}: {}", "Invalid configuration".red(), e);
            std::process::exit(2);
        }
    };

    // ── Sensor permission ─────────────────────────────────────────────────
    let granted = !matches!(
        prompt_line("  Allow motion sensor access? [Y/n]: ", "y")
            .trim()
            .to_lowercase()
            .as_str(),
        "n" | "no"
    );
    let (sensor, injector) = ChannelSensor::new();
    let sensor = if granted { sensor } else { sensor.denied() };

    // ── Runtime & pipeline ────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("plumb-rt")
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start runtime".red(), e);
            std::process::exit(1);
        }
    };

    let bus = EventBus::default();
    let mut alerts = bus.subscribe_to(Topic::SystemAlerts);

    let dispatcher = cfg
        .feedback_dispatcher()
        .with_haptic(Box::new(terminal::TerminalHaptic))
        .with_tone(Box::new(terminal::TerminalBell));
    let session = SessionController::new(session_config, dispatcher);

    let (frame_loop, handle) = match FrameLoop::new(
        session,
        sensor,
        terminal::TerminalSink::new(&cfg.protractor),
        bus.clone(),
        cfg.frame_rate_hz,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            println!("{}: {}", "Invalid configuration".red(), e);
            std::process::exit(2);
        }
    };
    let frame_task = runtime.spawn(frame_loop.run());

    // Permission is resolved before anything renders; wait for the verdict.
    let verdict = runtime.block_on(async {
        loop {
            match alerts.recv().await {
                Some(event) => match event.payload {
                    EventPayload::Lifecycle(_) => break Ok(()),
                    EventPayload::Fault { message, .. } => break Err(message),
                    _ => {}
                },
                None => break Err("event bus closed".to_string()),
            }
        }
    });
    drop(alerts);
    if let Err(message) = verdict {
        println!("  {} {}", "✗".red().bold(), message);
        match runtime.block_on(frame_task) {
            Ok(Err(LevelError::PermissionDenied)) => println!(
                "  {}",
                "Motion sensor access was refused; restart plumb to ask again.".dimmed()
            ),
            Ok(Err(LevelError::UnsupportedDevice)) => {
                println!("  {}", "This device has no orientation sensor.".dimmed())
            }
            other => warn!(result = ?other, "frame loop ended unexpectedly"),
        }
        return;
    }

    let (pose_tx, pose_rx) = watch::channel(RawSample::new(0.0, 0.0, 0.0));
    let device_task = runtime.spawn(device::run_device(pose_rx, injector));

    // ── Offline asset cache ───────────────────────────────────────────────
    let cache = cfg.cache_path.as_ref().and_then(|path| {
        let asset_dir = cfg.asset_dir.clone().unwrap_or_else(|| ".".into());
        match AssetCache::open(path) {
            Ok(cache) => {
                info!(path = %path.display(), assets = %asset_dir.display(), "asset cache opened");
                Some(repl::CacheSession {
                    cache,
                    fetcher: DirFetcher::new(asset_dir),
                })
            }
            Err(e) => {
                println!("{}: {}", "Asset cache unavailable".yellow(), e);
                None
            }
        }
    });

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let ctrlc_handle = handle.clone();
    let bus_ctrlc_ref = bus.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the level …".yellow().bold());

        let _ = bus_ctrlc_ref.publish_to(
            Topic::SystemAlerts,
            Event::new(
                "plumb-cli",
                EventPayload::Fault {
                    component: "cli".to_string(),
                    message: "operator interrupt".to_string(),
                },
            ),
        );
        // Already stopped when the REPL quit first.
        let _ = ctrlc_handle.send_blocking(Command::Shutdown);

        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    println!();
    println!(
        "  Type {} for a list of commands, {} to tilt the device.\n",
        "/help".bold().cyan(),
        "/tilt <beta> <gamma>".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(repl::Repl {
        frames: handle.clone(),
        pose: pose_tx,
        cache,
        runtime: runtime.handle().clone(),
        shutdown,
    });

    // ── Teardown ──────────────────────────────────────────────────────────
    let _ = handle.send_blocking(Command::Shutdown);
    match runtime.block_on(frame_task) {
        Ok(Ok(snapshot)) => {
            info!(mode = %snapshot.mode, "level stopped");
            println!("  {}", "✓ Level stopped.".green());
        }
        Ok(Err(e)) => println!("{}: {}", "Level error".red(), e),
        Err(e) => error!(error = %e, "frame loop task panicked"),
    }
    // The pose sender went away with the REPL, which ends the device.
    if let Err(e) = runtime.block_on(device_task) {
        error!(error = %e, "simulated sensor task panicked");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        plumb First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up plumb.\n");

    let mut cfg = config::Config::default();

    println!("  Which mode should the level start in?");
    println!("    1) Horizontal bubble  (default)");
    println!("    2) Vertical bubble / plumb");
    println!("    3) Angle finder");
    let choice = prompt_line("  Enter choice [1]: ", "1");
    cfg.default_mode = match choice.trim() {
        "2" => plumb_types::Mode::Vertical,
        "3" => plumb_types::Mode::AngleFinder,
        _ => plumb_types::Mode::Horizontal,
    };

    let tol_str = prompt_line(
        &format!("  Level tolerance in degrees [{}]: ", cfg.level_tolerance),
        &cfg.level_tolerance.to_string(),
    );
    if let Ok(t) = tol_str.trim().parse::<f64>()
        && t.is_finite()
        && t >= 0.0
    {
        cfg.level_tolerance = t;
    }

    let fb = prompt_line("  Vibrate and beep when level? [Y/n]: ", "y");
    cfg.feedback_enabled = !matches!(fb.trim().to_lowercase().as_str(), "n" | "no");

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"         __                 __  "#.bold().cyan());
    println!("{}", r#"   ___  / /_ ____ _  ___   / /  "#.bold().cyan());
    println!("{}", r#"  / _ \/ / // /  ' \/ _ \ /_/   "#.bold().cyan());
    println!("{}", r#" / .__/_/\_,_/_/_/_/_.__/(_)    "#.bold().cyan());
    println!("{}", r#"/_/                             "#.bold().cyan());
    println!(
        "  {}  {}",
        "spirit level & angle finder".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Prompt helper
// ─────────────────────────────────────────────────────────────────────────────

/// Print `prompt`, read one line and return it; falls back to `default` on
/// empty input or read errors.
fn prompt_line(prompt: &str, default: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    match io::stdin().lock().read_line(&mut buf) {
        Ok(_) if !buf.trim().is_empty() => buf.trim().to_string(),
        _ => default.to_string(),
    }
}
