//! Client settings, read from `config.json` in the app data dir.

use crate::camera::{Camera, CaptureConfig, CommandCamera, FileCamera};
use crate::error::ConfigError;
use crate::scanner::{CodeScanner, KeyboardScanner, SerialScanner};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

lazy_static! {
    pub static ref APP_DATA: Option<ProjectDirs> =
        ProjectDirs::from("cl", "clipcontrol", "ClipControlGuard");
}

pub const API_URL_ENV: &str = "CLIPCONTROL_API_URL";

pub fn data_dir() -> Result<PathBuf, ConfigError> {
    APP_DATA
        .as_ref()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Sent as `dispositivo_id` with each delivery when set.
    pub device_id: Option<String>,
    pub stats_refresh_secs: u64,
    pub camera: CameraSettings,
    pub scanner: ScannerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: "http://localhost:8000/api".to_owned(),
            device_id: None,
            stats_refresh_secs: 15,
            camera: CameraSettings::default(),
            scanner: ScannerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// `quality`, `target_width` and `target_height` sit directly in the
    /// `camera` object.
    #[serde(flatten)]
    pub capture: CaptureConfig,
    /// Program and arguments of an external still-capture tool.
    pub command: Option<Vec<String>>,
    /// Read stills from this file instead of running a program.
    pub still_path: Option<PathBuf>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            capture: CaptureConfig::default(),
            command: Some(
                [
                    "fswebcam",
                    "-q",
                    "--no-banner",
                    "-r",
                    "{width}x{height}",
                    "--jpeg",
                    "{quality}",
                    "-",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ),
            still_path: None,
        }
    }
}

impl CameraSettings {
    pub fn capture_config(&self) -> CaptureConfig {
        self.capture
    }

    pub fn build(&self) -> Result<Box<dyn Camera>, ConfigError> {
        if let Some(path) = &self.still_path {
            return Ok(Box::new(FileCamera::new(path.clone())));
        }
        match self.command.as_deref() {
            Some([program, args @ ..]) => Ok(Box::new(CommandCamera::new(
                program.clone(),
                args.to_vec(),
            ))),
            _ => Err(ConfigError::Invalid {
                field: "camera",
                reason: "set either camera.command or camera.still_path".to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerSource {
    Keyboard,
    Serial,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub source: ScannerSource,
    pub serial_port: Option<String>,
    pub baud_rate: u32,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            source: ScannerSource::Keyboard,
            serial_port: None,
            baud_rate: 9600,
        }
    }
}

impl ScannerSettings {
    pub fn build(&self) -> Result<Box<dyn CodeScanner>, ConfigError> {
        match (self.source, &self.serial_port) {
            (ScannerSource::Keyboard, _) => Ok(Box::new(KeyboardScanner::stdin())),
            (ScannerSource::Serial, Some(port)) => {
                Ok(Box::new(SerialScanner::new(port.clone(), self.baud_rate)))
            }
            (ScannerSource::Serial, None) => Err(ConfigError::Invalid {
                field: "scanner.serial_port",
                reason: "required when scanner.source is \"serial\"".to_owned(),
            }),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.json"))
    }

    /// Load `config.json` (or `path`), falling back to defaults when the file
    /// does not exist. The API URL may be overridden from the environment.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Config::default_path()?,
        };
        let mut config = Config::from_file(&path)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            debug!("api_base_url overridden by {}", API_URL_ENV);
            config.api_base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| {
            ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_owned(),
            })
        };
        if self.api_base_url.trim().is_empty() {
            return invalid("api_base_url", "must not be empty");
        }
        let capture = &self.camera.capture;
        if capture.quality > 100 {
            return invalid("camera.quality", "must be between 0 and 100");
        }
        if capture.target_width == 0 || capture.target_height == 0 {
            return invalid("camera.target_width/target_height", "must be non-zero");
        }
        if self.stats_refresh_secs == 0 {
            return invalid("stats_refresh_secs", "must be at least 1");
        }
        if self.scanner.source == ScannerSource::Serial && self.scanner.serial_port.is_none() {
            return invalid("scanner.serial_port", "required for a serial scanner");
        }
        Ok(())
    }
}
