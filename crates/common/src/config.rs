//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment flag that forces the software (CRF) encoder.
pub const FORCE_CPU_ENV: &str = "HUDCLIP_FORCE_CPU";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where rendered clips are written.
    pub output_dir: PathBuf,

    /// Encoder binary (name on PATH or absolute path).
    pub ffmpeg_path: PathBuf,

    /// Prober binary (name on PATH or absolute path).
    pub ffprobe_path: PathBuf,

    /// Use the software encoder with quality-factor rate control.
    pub force_cpu: bool,

    /// Assumed audio bitrate for tiered budgets; 128 kbps when unset.
    pub audio_kbps_override: Option<u32>,

    /// Default render parameters.
    pub defaults: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default render parameters, overridable per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Quality tier (0-4, 4 = match source size).
    pub quality_tier: u8,

    /// Background music volume in [0.0, 1.0].
    pub music_volume: f64,

    /// Disable fade padding and fade filters.
    pub disable_fades: bool,

    /// Still-frame intro length in seconds (0 = no intro).
    pub intro_still_secs: f64,

    /// Render the mobile portrait layout.
    pub mobile: bool,

    /// Include the teammate overlay in the mobile layout.
    pub teammates_overlay: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hudclip=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            force_cpu: false,
            audio_kbps_override: None,
            defaults: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            quality_tier: 2,
            music_volume: 0.35,
            disable_fades: false,
            intro_still_secs: 0.0,
            mobile: false,
            teammates_overlay: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// The force-CPU environment flag is applied on top of the file.
    pub fn load() -> Self {
        let mut config = Self::load_from(&config_file_path());
        if force_cpu_from_env() {
            config.force_cpu = true;
        }
        config
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Whether the process-wide software-encoder override is set.
pub fn force_cpu_from_env() -> bool {
    std::env::var(FORCE_CPU_ENV)
        .map(|v| v.trim() == "1")
        .unwrap_or(false)
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("hudclip").join("config.json")
}

/// Default output directory: `exports/` beside the application base directory.
///
/// The base directory is the parent of the directory holding the executable.
fn default_output_dir() -> PathBuf {
    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("exports")
}
