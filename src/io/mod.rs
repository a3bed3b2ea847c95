// src/io/mod.rs
//
// Transport abstraction and the serial ingestion pipeline.
//
// A transport is anything that can be opened, hand out one exclusive reader
// that yields byte chunks, and be closed again. The pipeline owns a transport
// for the duration of a session, turns its bytes into lines and its lines into
// frames.

pub mod channel;
mod error;
pub mod framer;
pub mod pipeline;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub mod serial;
mod types;

pub use channel::{ChannelFeeder, ChannelTransport};
pub use error::IoError;
pub use framer::LineFramer;
pub use pipeline::SerialPipeline;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub use serial::{list_serial_ports, SerialConfig, SerialPortTransport};
pub use types::{EndReason, PipelineEvent, StreamEnded};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::settings::SerialSettings;

// ============================================================================
// Shared Types
// ============================================================================

/// Pipeline session state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "port")]
pub enum PipelineState {
    Disconnected,
    Connecting(String),
    /// Read loop running against the named port
    Connected(String),
}

impl PipelineState {
    pub fn is_connected(&self) -> bool {
        matches!(self, PipelineState::Connected(_))
    }
}

/// What a transport can do on this runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TransportCapabilities {
    pub can_read: bool,
}

impl TransportCapabilities {
    pub fn read_only() -> Self {
        Self { can_read: true }
    }

    pub fn none() -> Self {
        Self { can_read: false }
    }
}

/// Information about a transport endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PortDescription {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl PortDescription {
    pub fn named(port_name: impl Into<String>, port_type: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            port_type: port_type.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Transport Traits
// ============================================================================

/// A byte-oriented transport the pipeline can read from.
#[async_trait]
pub trait Transport: Send {
    /// Capabilities on this runtime. Checked once at connect time.
    fn capabilities(&self) -> TransportCapabilities;

    fn describe(&self) -> PortDescription;

    async fn open(&mut self) -> Result<(), IoError>;

    /// Hand out the exclusive reader. Fails with `IoError::Busy` while a
    /// previously acquired reader has not been released.
    fn acquire_reader(&mut self) -> Result<Box<dyn TransportReader>, IoError>;

    /// Close the transport. Only called once the reader has been released.
    async fn close(&mut self) -> Result<(), IoError>;
}

/// Exclusive read handle on an open transport.
#[async_trait]
pub trait TransportReader: Send {
    /// Wait for the next chunk.
    ///
    /// `Ok(None)` is end of stream. `Err(IoError::Break { .. })` is a
    /// recoverable break condition; any other error is fatal. Must be cancel
    /// safe: dropping the future loses no data.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, IoError>;

    /// Give the handle back to its transport, waiting for any background
    /// reader to finish.
    async fn release(&mut self);

    /// Non-blocking release for drop paths: signal the background reader to
    /// stop and let it hand the handle back when it exits.
    fn release_detached(&mut self);
}

/// Owns a reader and releases it exactly once: through `release` or, failing
/// that, on drop.
pub struct ReaderLease {
    reader: Option<Box<dyn TransportReader>>,
}

impl ReaderLease {
    pub fn new(reader: Box<dyn TransportReader>) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    pub async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, IoError> {
        match self.reader.as_mut() {
            Some(reader) => reader.read_chunk().await,
            None => Ok(None),
        }
    }

    pub async fn release(mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.release().await;
        }
    }
}

impl Drop for ReaderLease {
    fn drop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.release_detached();
        }
    }
}

/// Open the platform serial transport for `port` with the configured line settings.
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub fn open_serial_transport(port: &str, settings: &SerialSettings) -> Result<Box<dyn Transport>, IoError> {
    Ok(Box::new(SerialPortTransport::new(SerialConfig::from_settings(port, settings))))
}

/// List serial ports - always empty without serial support
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
pub fn list_serial_ports() -> Result<Vec<PortDescription>, String> {
    Ok(vec![])
}

/// Serial ports are only available on desktop platforms.
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
pub fn open_serial_transport(port: &str, _settings: &SerialSettings) -> Result<Box<dyn Transport>, IoError> {
    Err(IoError::unsupported(port, "serial ports are not available on this platform"))
}
