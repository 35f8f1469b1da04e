use crate::audio::AudioFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Recordings are named `<filename_base>_<N>.wav`
    #[serde(default = "default_filename_base")]
    pub filename_base: String,

    #[serde(default = "default_record_seconds")]
    pub record_seconds: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames read from the device per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Defaults to `Recordings/` next to the executable
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,

    #[serde(default = "default_button_device")]
    pub button_device: PathBuf,

    /// evdev key codes for front-left, front-right and side buttons
    #[serde(default = "default_button_codes")]
    pub button_codes: [u16; 3],

    #[serde(default = "default_led_device")]
    pub led_device: PathBuf,

    #[serde(default = "default_led_count")]
    pub led_count: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub power_off_command: Option<String>,

    #[serde(default)]
    pub debug: bool,
}

fn default_filename_base() -> String {
    "recording".to_string()
}

fn default_record_seconds() -> f32 {
    5.0
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_chunk_size() -> usize {
    2048
}

fn default_button_device() -> PathBuf {
    PathBuf::from("/dev/input/event0")
}

fn default_button_codes() -> [u16; 3] {
    // BTN_0, BTN_1, BTN_2
    [0x100, 0x101, 0x102]
}

fn default_led_device() -> PathBuf {
    PathBuf::from("/dev/matrixio_everloop")
}

fn default_led_count() -> usize {
    18
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filename_base: default_filename_base(),
            record_seconds: default_record_seconds(),
            sample_rate: default_sample_rate(),
            chunk_size: default_chunk_size(),
            recordings_dir: None,
            button_device: default_button_device(),
            button_codes: default_button_codes(),
            led_device: default_led_device(),
            led_count: default_led_count(),
            poll_interval_ms: default_poll_interval_ms(),
            power_off_command: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/micarray-recorder/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("micarray-recorder").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.filename_base.is_empty() {
            return Err(anyhow::anyhow!("filename_base cannot be empty"));
        }

        if !(self.record_seconds.is_finite() && self.record_seconds > 0.0) {
            return Err(anyhow::anyhow!("record_seconds must be a positive number"));
        }

        if self.sample_rate == 0 {
            return Err(anyhow::anyhow!("sample_rate must be greater than zero"));
        }

        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("chunk_size must be greater than zero"));
        }

        if self.led_count == 0 {
            return Err(anyhow::anyhow!("led_count must be greater than zero"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than zero"));
        }

        Ok(())
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.chunk_size)
    }

    pub fn record_duration(&self) -> Duration {
        Duration::from_secs_f32(self.record_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Directory recordings are written to: configured, or `Recordings/` beside the binary
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.recordings_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let app_dir = exe
            .parent()
            .context("Executable path has no parent directory")?;
        Ok(app_dir.join("Recordings"))
    }
}
