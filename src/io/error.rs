// src/io/error.rs
//
// Transport-level error type. Parsing never produces errors (bad input
// degrades to a partly blank frame), so everything here concerns the
// transport and the session around it.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoError {
    /// The runtime cannot provide this kind of transport at all
    Unsupported { device: String, detail: String },
    /// Opening or configuring the transport failed
    Connection { device: String, detail: String },
    /// Non-fatal signal discontinuity (break condition) on the line
    Break { device: String },
    /// Any other read failure; ends the session
    Read { device: String, detail: String },
    /// The exclusive read handle is already held, or a session is already running
    Busy { device: String },
    /// Operation requires an open transport
    NotConnected { device: String },
}

impl IoError {
    pub fn unsupported(device: impl Into<String>, detail: impl Into<String>) -> Self {
        IoError::Unsupported {
            device: device.into(),
            detail: detail.into(),
        }
    }

    pub fn connection(device: impl Into<String>, detail: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.into(),
            detail: detail.into(),
        }
    }

    pub fn line_break(device: impl Into<String>) -> Self {
        IoError::Break {
            device: device.into(),
        }
    }

    pub fn read(device: impl Into<String>, detail: impl Into<String>) -> Self {
        IoError::Read {
            device: device.into(),
            detail: detail.into(),
        }
    }

    pub fn busy(device: impl Into<String>) -> Self {
        IoError::Busy {
            device: device.into(),
        }
    }

    pub fn not_connected(device: impl Into<String>) -> Self {
        IoError::NotConnected {
            device: device.into(),
        }
    }

    /// A break condition: log it and keep reading.
    pub fn is_break(&self) -> bool {
        matches!(self, IoError::Break { .. })
    }

    /// Whether this error ends a read session.
    pub fn is_fatal(&self) -> bool {
        !self.is_break()
    }

    pub fn device(&self) -> &str {
        match self {
            IoError::Unsupported { device, .. }
            | IoError::Connection { device, .. }
            | IoError::Break { device }
            | IoError::Read { device, .. }
            | IoError::Busy { device }
            | IoError::NotConnected { device } => device,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Unsupported { device, detail } => {
                write!(f, "{}: transport not supported: {}", device, detail)
            }
            IoError::Connection { device, detail } => {
                write!(f, "{}: connection failed: {}", device, detail)
            }
            IoError::Break { device } => write!(f, "{}: break condition on line", device),
            IoError::Read { device, detail } => write!(f, "{}: read error: {}", device, detail),
            IoError::Busy { device } => write!(f, "{}: reader already active", device),
            IoError::NotConnected { device } => write!(f, "{}: not connected", device),
        }
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for String {
    fn from(e: IoError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_is_not_fatal() {
        let brk = IoError::line_break("/dev/ttyUSB0");
        assert!(brk.is_break());
        assert!(!brk.is_fatal());

        let read = IoError::read("/dev/ttyUSB0", "device reports readiness to read but returned no data");
        assert!(!read.is_break());
        assert!(read.is_fatal());
    }

    #[test]
    fn test_display_includes_device() {
        let e = IoError::unsupported("serial", "no serial support on this platform");
        assert_eq!(e.device(), "serial");
        assert!(e.to_string().starts_with("serial: transport not supported"));
        let s: String = IoError::busy("COM3").into();
        assert_eq!(s, "COM3: reader already active");
    }
}
