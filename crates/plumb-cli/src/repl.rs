//! REPL – Read-Eval-Print Loop for the plumb interactive shell.
//!
//! Supported slash-commands:
//!   /help                      – show this list
//!   /mode <h|v|angle>          – switch measuring mode
//!   /hold                      – freeze / unfreeze the reading
//!   /feedback                  – toggle vibration and tone
//!   /calibrate                 – zero the level at the current tilt
//!   /tilt <beta> <gamma> [a]   – set the simulated device pose
//!   /rotate <width> <height>   – resize the viewport (portrait / landscape)
//!   /hide | /show              – background / foreground the display
//!   /status [json]             – print the session state
//!   /cache <install|clear|status|get URL>
//!   /quit | /exit              – gracefully exit the CLI

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use plumb_cache::{APP_SHELL, AssetCache, CacheMessage, DirFetcher};
use plumb_runtime::{Command, FrameLoopHandle, SessionSnapshot};
use plumb_types::{Mode, RawSample};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// How often the prompt loop re-checks the shutdown flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed `/cache` sub-command.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCommand {
    Install,
    Clear,
    Status,
    Get(String),
}

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Help,
    Mode(Mode),
    Hold,
    Feedback,
    Calibrate,
    Tilt(RawSample),
    Rotate { width: u32, height: u32 },
    Hide,
    Show,
    Status { json: bool },
    Cache(CacheCommand),
    Quit,
}

/// Parse one line of input.
///
/// The error string is ready to show to the operator.
pub fn parse(line: &str) -> Result<ReplCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let no_args = |cmd: ReplCommand| {
        if args.is_empty() {
            Ok(cmd)
        } else {
            Err(format!("{head} takes no arguments"))
        }
    };

    match head {
        "/help" => no_args(ReplCommand::Help),
        "/mode" => match args.as_slice() {
            [name] => name
                .parse::<Mode>()
                .map(ReplCommand::Mode)
                .map_err(|e| e.to_string()),
            _ => Err("usage: /mode <horizontal|vertical|angle>".to_string()),
        },
        "/hold" => no_args(ReplCommand::Hold),
        "/feedback" => no_args(ReplCommand::Feedback),
        "/calibrate" => no_args(ReplCommand::Calibrate),
        "/tilt" => {
            let usage = || "usage: /tilt <beta> <gamma> [alpha]".to_string();
            let numbers = args
                .iter()
                .map(|a| a.parse::<f64>().map_err(|_| format!("'{a}' is not a number")))
                .collect::<Result<Vec<_>, _>>()?;
            match numbers.as_slice() {
                [beta, gamma] => Ok(ReplCommand::Tilt(RawSample {
                    beta: Some(*beta),
                    gamma: Some(*gamma),
                    alpha: None,
                })),
                [beta, gamma, alpha] => Ok(ReplCommand::Tilt(RawSample::new(*beta, *gamma, *alpha))),
                _ => Err(usage()),
            }
        }
        "/rotate" => match args.as_slice() {
            [w, h] => match (w.parse::<u32>(), h.parse::<u32>()) {
                (Ok(width), Ok(height)) => Ok(ReplCommand::Rotate { width, height }),
                _ => Err("viewport size must be two whole numbers".to_string()),
            },
            _ => Err("usage: /rotate <width> <height>".to_string()),
        },
        "/hide" => no_args(ReplCommand::Hide),
        "/show" => no_args(ReplCommand::Show),
        "/status" => match args.as_slice() {
            [] => Ok(ReplCommand::Status { json: false }),
            ["json"] => Ok(ReplCommand::Status { json: true }),
            _ => Err("usage: /status [json]".to_string()),
        },
        "/cache" => match args.as_slice() {
            ["install"] => Ok(ReplCommand::Cache(CacheCommand::Install)),
            ["clear"] => Ok(ReplCommand::Cache(CacheCommand::Clear)),
            ["status"] | [] => Ok(ReplCommand::Cache(CacheCommand::Status)),
            ["get", url] => Ok(ReplCommand::Cache(CacheCommand::Get(url.to_string()))),
            _ => Err("usage: /cache <install|clear|status|get URL>".to_string()),
        },
        "/quit" | "/exit" => Ok(ReplCommand::Quit),
        other => Err(format!("Unknown command: '{other}'")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// The offline asset cache and the origin it is filled from.
pub struct CacheSession {
    pub cache: AssetCache,
    pub fetcher: DirFetcher,
}

/// Everything the REPL drives.
pub struct Repl {
    pub frames: FrameLoopHandle,
    pub pose: watch::Sender<RawSample>,
    pub cache: Option<CacheSession>,
    pub runtime: Handle,
    pub shutdown: Arc<AtomicBool>,
}

/// Entry point for the interactive REPL.
///
/// Runs on the calling (non-runtime) thread.  Returns when the operator
/// quits, stdin closes or the shutdown flag is raised.
pub fn run(mut repl: Repl) {
    let lines = spawn_stdin_reader();
    let mut stdout = io::stdout();

    'prompt: loop {
        if repl.shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "plumb>".bold().cyan());
        stdout.flush().ok();

        let line = loop {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => break line,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if repl.shutdown.load(Ordering::SeqCst) {
                        break 'prompt;
                    }
                }
                // EOF or read error.
                Err(mpsc::RecvTimeoutError::Disconnected) => break 'prompt,
            }
        };

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        match parse(cmd) {
            Ok(ReplCommand::Quit) => {
                println!("{}", "Goodbye.".green());
                repl.shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(command) => {
                if let Err(e) = repl.execute(command) {
                    println!("{}: {}", "Error".red(), e);
                }
            }
            Err(e) => {
                println!(
                    "{} Type {} for available commands.",
                    e.red(),
                    "/help".bold()
                );
            }
        }
    }
}

/// Read stdin on its own thread so the prompt loop can notice Ctrl-C.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            }
        }
    });
    rx
}

impl Repl {
    fn execute(&mut self, command: ReplCommand) -> Result<(), String> {
        match command {
            ReplCommand::Help => cmd_help(),
            ReplCommand::Mode(mode) => {
                self.send(Command::SetMode(mode))?;
                println!("  mode → {}", mode.to_string().bold());
            }
            ReplCommand::Hold => self.send(Command::ToggleHold)?,
            ReplCommand::Feedback => {
                self.send(Command::ToggleFeedback)?;
                let snapshot = self.snapshot()?;
                println!("  feedback {}", on_off(snapshot.feedback_enabled));
            }
            ReplCommand::Calibrate => {
                self.send(Command::Calibrate)?;
                let snapshot = self.snapshot()?;
                println!(
                    "  calibrated at x={:.1}° y={:.1}°",
                    snapshot.calibration.x, snapshot.calibration.y
                );
            }
            ReplCommand::Tilt(sample) => {
                self.pose.send_replace(sample);
            }
            ReplCommand::Rotate { width, height } => {
                self.send(Command::Viewport { width, height })?;
            }
            ReplCommand::Hide => {
                self.frames.set_visible(false);
                println!("  {}", "display suspended".dimmed());
            }
            ReplCommand::Show => {
                self.frames.set_visible(true);
                println!("  {}", "display resumed".dimmed());
            }
            ReplCommand::Status { json } => {
                let snapshot = self.snapshot()?;
                if json {
                    let text = serde_json::to_string_pretty(&snapshot)
                        .map_err(|e| format!("Failed to serialize status: {e}"))?;
                    println!("{text}");
                } else {
                    print_status(&snapshot);
                }
            }
            ReplCommand::Cache(cmd) => self.cache_command(cmd)?,
            ReplCommand::Quit => {}
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), String> {
        self.frames.send_blocking(command).map_err(|e| e.to_string())
    }

    fn snapshot(&self) -> Result<SessionSnapshot, String> {
        self.frames.snapshot_blocking().map_err(|e| e.to_string())
    }

    fn cache_command(&mut self, cmd: CacheCommand) -> Result<(), String> {
        let Some(session) = self.cache.as_mut() else {
            return Err("asset cache disabled; set cache_path in ~/.plumb/config.toml".to_string());
        };
        let CacheSession { cache, fetcher } = session;

        match cmd {
            CacheCommand::Install => {
                let stored = self
                    .runtime
                    .block_on(cache.install(&*fetcher, APP_SHELL))
                    .map_err(|e| e.to_string())?;
                let evicted = cache.activate().map_err(|e| e.to_string())?;
                println!(
                    "  {} {} assets cached in {}",
                    "✓".green().bold(),
                    stored,
                    cache.name().bold()
                );
                for name in evicted {
                    println!("  evicted {}", name.dimmed());
                }
            }
            CacheCommand::Clear => {
                cache
                    .handle_message(CacheMessage::ClearCache)
                    .map_err(|e| e.to_string())?;
                println!("  {} all caches cleared", "✓".green().bold());
            }
            CacheCommand::Status => {
                let names = cache.cache_names().map_err(|e| e.to_string())?;
                println!("{}", "Asset Cache".bold().underline());
                println!("  current : {}", cache.name().bold());
                println!("  active  : {}", on_off(cache.is_active()));
                if names.is_empty() {
                    println!("  {}", "(empty)".dimmed());
                }
                for name in names {
                    let count = cache.entry_count(&name).map_err(|e| e.to_string())?;
                    println!("  {:<28} {} entries", name, count.to_string().yellow());
                }
            }
            CacheCommand::Get(url) => {
                let outcome = self
                    .runtime
                    .block_on(cache.fetch(&*fetcher, &url))
                    .map_err(|e| e.to_string())?;
                let origin = if outcome.from_cache {
                    "cache".green()
                } else if outcome.stored {
                    "network (stored)".yellow()
                } else {
                    "network".yellow()
                };
                println!(
                    "  {} {} – {} bytes from {}",
                    outcome.response.status.to_string().bold(),
                    url,
                    outcome.response.body.len(),
                    origin
                );
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "plumb Commands".bold().underline());
    println!("  {}           – horizontal, vertical or angle", "/mode <m>".bold().cyan());
    println!("  {}               – freeze / unfreeze the reading", "/hold".bold().cyan());
    println!("  {}           – toggle vibration and tone", "/feedback".bold().cyan());
    println!("  {}          – zero the level at the current tilt", "/calibrate".bold().cyan());
    println!("  {}  – set the simulated pose (degrees)", "/tilt <b> <g> [a]".bold().cyan());
    println!("  {}       – resize the viewport", "/rotate <w> <h>".bold().cyan());
    println!("  {}        – background / foreground", "/hide  /show".bold().cyan());
    println!("  {}      – print session state", "/status [json]".bold().cyan());
    println!("  {}   – install | clear | status | get URL", "/cache <cmd>".bold().cyan());
    println!("  {}        – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn print_status(s: &SessionSnapshot) {
    println!("{}", "Session".bold().underline());
    println!("  mode        : {}", s.mode.to_string().bold());
    println!("  holding     : {}", on_off(s.holding));
    println!("  feedback    : {}", on_off(s.feedback_enabled));
    println!(
        "  filtered    : x={:.2}° y={:.2}° z={:.2}°",
        s.filtered.x, s.filtered.y, s.filtered.z
    );
    println!(
        "  calibration : x={:.2}° y={:.2}°",
        s.calibration.x, s.calibration.y
    );
    println!(
        "  level       : {}",
        if s.is_level {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    println!("  alpha / tol : {} / {}°", s.alpha, s.tolerance);
}

fn on_off(flag: bool) -> colored::ColoredString {
    if flag { "on".green() } else { "off".dimmed() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("/help"), Ok(ReplCommand::Help));
        assert_eq!(parse("  /hold "), Ok(ReplCommand::Hold));
        assert_eq!(parse("/feedback"), Ok(ReplCommand::Feedback));
        assert_eq!(parse("/calibrate"), Ok(ReplCommand::Calibrate));
        assert_eq!(parse("/hide"), Ok(ReplCommand::Hide));
        assert_eq!(parse("/show"), Ok(ReplCommand::Show));
        assert_eq!(parse("/exit"), Ok(ReplCommand::Quit));
        assert_eq!(parse("/quit"), Ok(ReplCommand::Quit));
    }

    #[test]
    fn no_arg_commands_reject_arguments() {
        assert!(parse("/hold now").unwrap_err().contains("no arguments"));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(parse("/mode v"), Ok(ReplCommand::Mode(Mode::Vertical)));
        assert_eq!(parse("/mode angle"), Ok(ReplCommand::Mode(Mode::AngleFinder)));
        assert!(parse("/mode").is_err());
        assert!(parse("/mode sideways").is_err());
    }

    #[test]
    fn parses_tilt_with_optional_heading() {
        assert_eq!(
            parse("/tilt 10 -2.5"),
            Ok(ReplCommand::Tilt(RawSample {
                beta: Some(10.0),
                gamma: Some(-2.5),
                alpha: None,
            }))
        );
        assert_eq!(
            parse("/tilt 0 0 270"),
            Ok(ReplCommand::Tilt(RawSample::new(0.0, 0.0, 270.0)))
        );
        assert!(parse("/tilt 5").is_err());
        assert!(parse("/tilt a b").unwrap_err().contains("not a number"));
    }

    #[test]
    fn parses_rotate() {
        assert_eq!(
            parse("/rotate 800 400"),
            Ok(ReplCommand::Rotate { width: 800, height: 400 })
        );
        assert!(parse("/rotate 800").is_err());
        assert!(parse("/rotate -1 400").is_err());
    }

    #[test]
    fn parses_status_and_cache() {
        assert_eq!(parse("/status"), Ok(ReplCommand::Status { json: false }));
        assert_eq!(parse("/status json"), Ok(ReplCommand::Status { json: true }));
        assert_eq!(parse("/cache"), Ok(ReplCommand::Cache(CacheCommand::Status)));
        assert_eq!(parse("/cache install"), Ok(ReplCommand::Cache(CacheCommand::Install)));
        assert_eq!(parse("/cache clear"), Ok(ReplCommand::Cache(CacheCommand::Clear)));
        assert_eq!(
            parse("/cache get /index.html"),
            Ok(ReplCommand::Cache(CacheCommand::Get("/index.html".to_string())))
        );
        assert!(parse("/cache purge").is_err());
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert!(parse("/fly").unwrap_err().contains("Unknown command"));
        assert!(parse("   ").is_err());
    }
}
