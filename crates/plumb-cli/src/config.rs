//! Configuration – reads/writes `~/.plumb/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use plumb_hal::{FeedbackDispatcher, HapticPattern, ToneSpec};
use plumb_perception::{AngleFilter, ProtractorFrame};
use plumb_runtime::SessionConfig;
use plumb_types::Mode;

/// Persisted user configuration stored in `~/.plumb/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Smoothing factor in `(0, 1]`.  Higher tracks faster but jitters more.
    #[serde(default = "default_filter_alpha")]
    pub filter_alpha: f64,

    /// Degrees either side of 0° / 90° that count as level.
    #[serde(default = "default_level_tolerance")]
    pub level_tolerance: f64,

    #[serde(default = "default_true")]
    pub feedback_enabled: bool,

    #[serde(default)]
    pub default_mode: Mode,

    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    /// Where the protractor is drawn; a `[protractor]` table.
    #[serde(default)]
    pub protractor: ProtractorFrame,

    /// Vibration on/off durations, starting with "on".
    #[serde(default = "default_haptic_pattern_ms")]
    pub haptic_pattern_ms: Vec<u32>,

    #[serde(default = "default_tone_hz")]
    pub tone_hz: f64,

    #[serde(default = "default_tone_duration_ms")]
    pub tone_duration_ms: u32,

    /// SQLite file for the offline asset cache.  Caching is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Directory served as the app's origin when filling the asset cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<PathBuf>,
}

fn default_filter_alpha() -> f64 {
    plumb_perception::DEFAULT_ALPHA
}
fn default_level_tolerance() -> f64 {
    plumb_perception::DEFAULT_TOLERANCE
}
fn default_true() -> bool {
    true
}
fn default_frame_rate_hz() -> u32 {
    plumb_runtime::DEFAULT_FRAME_RATE_HZ
}
fn default_haptic_pattern_ms() -> Vec<u32> {
    HapticPattern::default().0
}
fn default_tone_hz() -> f64 {
    ToneSpec::default().frequency_hz
}
fn default_tone_duration_ms() -> u32 {
    ToneSpec::default().duration_ms
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_alpha: default_filter_alpha(),
            level_tolerance: default_level_tolerance(),
            feedback_enabled: true,
            default_mode: Mode::default(),
            frame_rate_hz: default_frame_rate_hz(),
            protractor: ProtractorFrame::default(),
            haptic_pattern_ms: default_haptic_pattern_ms(),
            tone_hz: default_tone_hz(),
            tone_duration_ms: default_tone_duration_ms(),
            cache_path: None,
            asset_dir: None,
        }
    }
}

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.filter_alpha > 0.0 && self.filter_alpha <= 1.0) {
            return Err(format!(
                "filter_alpha must be in (0, 1], got {}",
                self.filter_alpha
            ));
        }
        if !self.level_tolerance.is_finite() || self.level_tolerance < 0.0 {
            return Err(format!(
                "level_tolerance must be non-negative, got {}",
                self.level_tolerance
            ));
        }
        if self.frame_rate_hz == 0 {
            return Err("frame_rate_hz must be at least 1".to_string());
        }
        if !self.protractor.radius.is_finite() || self.protractor.radius <= 0.0 {
            return Err(format!(
                "protractor.radius must be positive, got {}",
                self.protractor.radius
            ));
        }
        if self.tone_hz <= 0.0 {
            return Err(format!("tone_hz must be positive, got {}", self.tone_hz));
        }
        Ok(())
    }

    /// Session tunables derived from this config.
    pub fn session_config(&self) -> Result<SessionConfig, String> {
        self.validate()?;
        let filter = AngleFilter::new(self.filter_alpha).map_err(|e| e.to_string())?;
        Ok(SessionConfig {
            filter,
            tolerance: self.level_tolerance,
            initial_mode: self.default_mode,
            feedback_enabled: self.feedback_enabled,
            protractor: self.protractor,
        })
    }

    /// A dispatcher with this config's cue shapes and no channels attached.
    pub fn feedback_dispatcher(&self) -> FeedbackDispatcher {
        FeedbackDispatcher::new(
            HapticPattern(self.haptic_pattern_ms.clone()),
            ToneSpec {
                frequency_hz: self.tone_hz,
                duration_ms: self.tone_duration_ms,
                ..ToneSpec::default()
            },
        )
    }
}

/// Return the path to `~/.plumb/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".plumb").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `PLUMB_*` environment variable overrides to `cfg`.
///
/// Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `PLUMB_FILTER_ALPHA` | `filter_alpha` |
/// | `PLUMB_LEVEL_TOLERANCE` | `level_tolerance` |
/// | `PLUMB_FRAME_RATE_HZ` | `frame_rate_hz` |
/// | `PLUMB_FEEDBACK` | `feedback_enabled` (`true`/`false`/`1`/`0`/`on`/`off`) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PLUMB_FILTER_ALPHA")
        && let Ok(alpha) = v.parse::<f64>()
    {
        cfg.filter_alpha = alpha;
    }
    if let Ok(v) = std::env::var("PLUMB_LEVEL_TOLERANCE")
        && let Ok(tolerance) = v.parse::<f64>()
    {
        cfg.level_tolerance = tolerance;
    }
    if let Ok(v) = std::env::var("PLUMB_FRAME_RATE_HZ")
        && let Ok(rate) = v.parse::<u32>()
    {
        cfg.frame_rate_hz = rate;
    }
    if let Ok(v) = std::env::var("PLUMB_FEEDBACK")
        && let Some(enabled) = parse_switch(&v)
    {
        cfg.feedback_enabled = enabled;
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.plumb/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner-only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
