// Photo capture.
//
// A capture holds the camera for exactly one still. Whatever happens while
// the still is being taken, the device is handed back before `capture`
// returns: the child process doing the capture is killed and reaped when
// its guard is dropped.

use crate::error::CheckInError;
use serde::Deserialize;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Encoding parameters handed to the capture backend. These only affect
/// size and fidelity of the JPEG, never what part of the scene is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub quality: u8,
    pub target_width: u32,
    pub target_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            quality: 80,
            target_width: 1280,
            target_height: 720,
        }
    }
}

/// A single JPEG still.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    jpeg: Vec<u8>,
}

impl Photo {
    pub fn from_jpeg(bytes: Vec<u8>) -> Result<Photo, CheckInError> {
        if bytes.is_empty() {
            return Err(CheckInError::Capture("camera returned no data".to_owned()));
        }
        if !bytes.starts_with(&JPEG_SOI) {
            return Err(CheckInError::Capture(
                "camera output is not a JPEG image".to_owned(),
            ));
        }
        Ok(Photo { jpeg: bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

// Never dump image bytes into logs
impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Photo").field("len", &self.jpeg.len()).finish()
    }
}

pub trait Camera {
    /// Take one still. Denied access, cancellation and hardware failure are
    /// all reported as errors; the device is released in every case.
    fn capture(&mut self, config: &CaptureConfig) -> Result<Photo, CheckInError>;
}

/// Runs an external still-capture program (e.g. `fswebcam` or
/// `libcamera-still`) that writes a JPEG to stdout.
///
/// `{width}`, `{height}` and `{quality}` in the arguments are replaced with
/// the values from the capture config.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandCamera {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, config: &CaptureConfig) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{width}", &config.target_width.to_string())
                    .replace("{height}", &config.target_height.to_string())
                    .replace("{quality}", &config.quality.to_string())
            })
            .collect()
    }
}

impl Camera for CommandCamera {
    fn capture(&mut self, config: &CaptureConfig) -> Result<Photo, CheckInError> {
        let args = self.expand_args(config);
        debug!(program = %self.program, ?args, "starting camera program");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(&self.program, e))?;
        let mut session = CameraSession::new(child);

        let bytes = session
            .read_output()
            .map_err(|e| CheckInError::Capture(format!("reading camera output: {}", e)))?;
        let status = session
            .finish()
            .map_err(|e| CheckInError::Capture(format!("waiting for camera: {}", e)))?;
        if !status.success() {
            // Non-zero exit covers both hardware errors and the user backing out
            return Err(CheckInError::Capture(format!(
                "camera program exited with {}",
                status
            )));
        }

        Photo::from_jpeg(bytes)
    }
}

fn spawn_error(program: &str, e: io::Error) -> CheckInError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            CheckInError::Permission(format!("not allowed to run {}", program))
        }
        io::ErrorKind::NotFound => {
            CheckInError::Capture(format!("camera program {} not found", program))
        }
        _ => CheckInError::Capture(format!("failed to start {}: {}", program, e)),
    }
}

/// Owns the running capture process. Dropping it without `finish` kills the
/// process so the camera is not left claimed.
struct CameraSession {
    child: Option<Child>,
}

impl CameraSession {
    fn new(child: Child) -> Self {
        CameraSession { child: Some(child) }
    }

    fn read_output(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        if let Some(stdout) = self.child.as_mut().and_then(|c| c.stdout.as_mut()) {
            stdout.read_to_end(&mut bytes)?;
        }
        Ok(bytes)
    }

    fn finish(mut self) -> io::Result<ExitStatus> {
        match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "camera process already released",
            )),
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to stop camera process: {}", e);
            }
            let _ = child.wait();
            debug!("camera process released");
        }
    }
}

/// Reads a still written to disk by something else, such as a kiosk's
/// capture daemon.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCamera { path: path.into() }
    }
}

impl Camera for FileCamera {
    fn capture(&mut self, config: &CaptureConfig) -> Result<Photo, CheckInError> {
        debug!(path = %self.path.display(), ?config, "reading still from file");
        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => {
                CheckInError::Permission(format!("cannot read {}", self.path.display()))
            }
            _ => CheckInError::Capture(format!("{}: {}", self.path.display(), e)),
        })?;
        Photo::from_jpeg(bytes)
    }
}
