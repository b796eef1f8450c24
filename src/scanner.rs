// Code scanners.
//
// Most handheld QR scanners enumerate as a USB keyboard and "type" the code
// followed by Enter, so the default scanner reads a line of input. Scanners
// wired to a serial port are read directly.

use crate::error::CheckInError;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, warn};

/// What a single scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Content(String),
    /// The guard stopped the scan before anything was read.
    Cancelled,
}

pub trait CodeScanner {
    /// Called before every scan; `Err(Permission)` keeps the scan from
    /// starting at all.
    fn check_permission(&mut self) -> Result<(), CheckInError>;

    /// Block until one code is read or the scan is cancelled.
    fn read_code(&mut self) -> Result<ScanOutcome, CheckInError>;
}

/// Line-oriented input. Implemented for stdin (which locks per call, so the
/// console can keep prompting on the same stream) and for in-memory cursors.
pub trait ReadLine {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl ReadLine for io::Stdin {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        io::Stdin::read_line(self, buf)
    }
}

impl<T: AsRef<[u8]>> ReadLine for io::Cursor<T> {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        io::BufRead::read_line(self, buf)
    }
}

/// Keyboard-wedge scanner: one line is one code. An empty line or end of
/// input stops the scan.
pub struct KeyboardScanner<R> {
    input: R,
}

impl KeyboardScanner<io::Stdin> {
    pub fn stdin() -> Self {
        KeyboardScanner { input: io::stdin() }
    }
}

impl<R: ReadLine> KeyboardScanner<R> {
    pub fn new(input: R) -> Self {
        KeyboardScanner { input }
    }
}

impl<R: ReadLine> CodeScanner for KeyboardScanner<R> {
    fn check_permission(&mut self) -> Result<(), CheckInError> {
        Ok(())
    }

    fn read_code(&mut self) -> Result<ScanOutcome, CheckInError> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| CheckInError::Capture(format!("reading scanner input: {}", e)))?;
        let content = line.trim_end_matches(&['\r', '\n'][..]);
        if read == 0 || content.is_empty() {
            debug!("keyboard scan cancelled");
            return Ok(ScanOutcome::Cancelled);
        }
        Ok(ScanOutcome::Content(content.to_owned()))
    }
}

/// Scanner attached to a serial port. The port is opened for each scan and
/// closed as soon as a code has been read.
#[derive(Debug, Clone)]
pub struct SerialScanner {
    path: String,
    baud_rate: u32,
}

// Poll interval only; there is no overall scan timeout.
const SERIAL_POLL: Duration = Duration::from_millis(500);
const MAX_CODE_LEN: usize = 4096;

impl SerialScanner {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        SerialScanner {
            path: path.into(),
            baud_rate,
        }
    }

    fn open(&self) -> Result<Box<dyn serialport::SerialPort>, CheckInError> {
        serialport::new(self.path.as_str(), self.baud_rate)
            .timeout(SERIAL_POLL)
            .open()
            .map_err(|e| open_error(&self.path, &e))
    }
}

// A missing or busy port is a device fault, not a refusal
fn open_error(path: &str, e: &serialport::Error) -> CheckInError {
    match e.kind() {
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            CheckInError::Permission(format!("cannot open {}", path))
        }
        _ => CheckInError::Capture(format!("{} unavailable: {}", path, e)),
    }
}

impl CodeScanner for SerialScanner {
    fn check_permission(&mut self) -> Result<(), CheckInError> {
        self.open().map(drop)
    }

    fn read_code(&mut self) -> Result<ScanOutcome, CheckInError> {
        let mut port = self.open()?;
        let mut code = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => match byte[0] {
                    b'\r' | b'\n' if code.is_empty() => continue,
                    b'\r' | b'\n' => break,
                    b => code.push(b),
                },
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Ok(ScanOutcome::Cancelled)
                }
                Err(e) => {
                    return Err(CheckInError::Capture(format!(
                        "reading {}: {}",
                        self.path, e
                    )))
                }
            }
            if code.len() > MAX_CODE_LEN {
                warn!(path = %self.path, "discarding overlong scanner input");
                code.clear();
            }
        }
        String::from_utf8(code)
            .map(ScanOutcome::Content)
            .map_err(|_| CheckInError::Format("scanner sent non UTF-8 data".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn keyboard_scanner_reads_one_code_per_line() {
        let mut scanner =
            KeyboardScanner::new(Cursor::new("CLIPCONTROL:abc123:0\r\nCLIPCONTROL:def:1\n"));
        assert!(scanner.check_permission().is_ok());
        assert_eq!(
            scanner.read_code().unwrap(),
            ScanOutcome::Content("CLIPCONTROL:abc123:0".to_owned())
        );
        assert_eq!(
            scanner.read_code().unwrap(),
            ScanOutcome::Content("CLIPCONTROL:def:1".to_owned())
        );
        assert_eq!(scanner.read_code().unwrap(), ScanOutcome::Cancelled);
    }

    #[test]
    fn empty_line_cancels() {
        let mut scanner = KeyboardScanner::new(Cursor::new("\n"));
        assert_eq!(scanner.read_code().unwrap(), ScanOutcome::Cancelled);
    }

    #[test]
    fn missing_serial_port_is_a_device_fault() {
        let mut scanner = SerialScanner::new("/dev/clipcontrol-does-not-exist", 9600);
        assert!(matches!(
            scanner.check_permission(),
            Err(CheckInError::Capture(_))
        ));
    }

    #[test]
    fn only_denied_access_is_a_permission_error() {
        let denied = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
            "Permission denied",
        );
        assert!(matches!(
            open_error("/dev/ttyACM0", &denied),
            CheckInError::Permission(_)
        ));

        for kind in [
            serialport::ErrorKind::NoDevice,
            serialport::ErrorKind::Io(io::ErrorKind::NotFound),
            serialport::ErrorKind::Unknown,
        ] {
            let err = serialport::Error::new(kind, "unavailable");
            assert!(matches!(
                open_error("/dev/ttyACM0", &err),
                CheckInError::Capture(_)
            ));
        }
    }
}
