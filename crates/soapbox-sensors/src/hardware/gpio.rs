//! Sysfs GPIO input lines.
//!
//! Uses the /sys/class/gpio interface: export the line, configure it as a
//! rising-edge input, then block in poll(2) on the value attribute until an
//! edge fires. Attribute files appear a moment after the export while udev
//! applies permissions, so configuration writes retry briefly.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::hardware::GPIO_CLASS;

/// Delay between attribute-write retries while udev settles an export.
const ATTR_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Attribute-write attempts before giving up on the line.
const ATTR_RETRIES: u32 = 10;

/// An exported GPIO input line configured for rising-edge events.
pub struct GpioLine {
    pin: u32,
    value: File,
}

impl GpioLine {
    /// Exports `pin` and configures it as a rising-edge input.
    pub fn export_input(pin: u32) -> Result<Self> {
        let base = PathBuf::from(GPIO_CLASS);
        let pin_dir = base.join(format!("gpio{}", pin));

        if !pin_dir.exists() {
            match fs::write(base.join("export"), pin.to_string()) {
                Ok(()) => {}
                // EBUSY means the line is already exported, which is fine.
                Err(e) if e.raw_os_error() == Some(libc::EBUSY) => {}
                Err(e) => {
                    debug!("Export of GPIO {} failed: {}", pin, e);
                    return Err(Error::GpioUnavailable(pin));
                }
            }
        }

        write_attr(&pin_dir.join("direction"), "in")?;
        write_attr(&pin_dir.join("edge"), "rising")?;

        let value = OpenOptions::new().read(true).open(pin_dir.join("value"))?;

        // Consume the initial level so the first poll waits for a real edge.
        let mut line = Self { pin, value };
        let _ = line.read_value();

        Ok(line)
    }

    /// Blocks until an edge fires or `timeout` elapses.
    ///
    /// Returns `Ok(true)` on an edge and `Ok(false)` on timeout.
    pub fn wait_for_edge(&mut self, timeout: Duration) -> Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.value.as_raw_fd(),
            events: libc::POLLPRI | libc::POLLERR,
            revents: 0,
        };

        // SAFETY: fds points to a valid pollfd that outlives the call, and
        // nfds is 1 to match.
        let rc = unsafe { libc::poll(&mut fds, 1, timeout.as_millis() as i32) };
        if rc < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        if rc == 0 {
            return Ok(false);
        }

        // Re-read the attribute to rearm edge detection.
        self.read_value()?;
        Ok(true)
    }

    /// Reads the current line level.
    pub fn read_value(&mut self) -> Result<u8> {
        self.value.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 4];
        let n = self.value.read(&mut buf)?;
        let raw = String::from_utf8_lossy(&buf[..n]);
        match raw.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(Error::MalformedAttribute {
                attr: format!("gpio{}/value", self.pin),
                raw: other.to_string(),
            }),
        }
    }

    /// Returns the line to the kernel. Best effort.
    pub fn unexport(pin: u32) {
        let path = PathBuf::from(GPIO_CLASS).join("unexport");
        if let Err(e) = fs::write(path, pin.to_string()) {
            debug!("Unexport of GPIO {} failed: {}", pin, e);
        }
    }
}

/// Writes a sysfs attribute, retrying while udev settles the export.
fn write_attr(path: &Path, value: &str) -> Result<()> {
    let mut last_err = None;
    for _ in 0..ATTR_RETRIES {
        match fs::write(path, value) {
            Ok(()) => return Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                last_err = Some(e);
                thread::sleep(ATTR_RETRY_DELAY);
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Err(Error::Io(last_err.unwrap_or_else(|| {
        std::io::Error::new(ErrorKind::TimedOut, "attribute write retries exhausted")
    })))
}
