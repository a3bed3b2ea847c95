// src/io/channel.rs
//
// In-process transport. Chunks, break conditions and failures are pushed
// through a `ChannelFeeder`; the pipeline reads them back exactly as it would
// from a serial port. Used for stdin input and for exercising the pipeline.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Mutex};

use super::{IoError, PortDescription, Transport, TransportCapabilities, TransportReader};

enum ChannelRead {
    Bytes(Vec<u8>),
    Break,
    Failure(String),
    End,
}

/// Sending side of a `ChannelTransport`. Dropping it ends the stream.
#[derive(Clone)]
pub struct ChannelFeeder {
    tx: mpsc::UnboundedSender<ChannelRead>,
}

impl ChannelFeeder {
    /// Queue a chunk. Returns false once the transport is gone.
    pub fn send_bytes(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.tx.send(ChannelRead::Bytes(bytes.into())).is_ok()
    }

    pub fn send_break(&self) -> bool {
        self.tx.send(ChannelRead::Break).is_ok()
    }

    pub fn send_failure(&self, detail: impl Into<String>) -> bool {
        self.tx.send(ChannelRead::Failure(detail.into())).is_ok()
    }

    pub fn finish(&self) -> bool {
        self.tx.send(ChannelRead::End).is_ok()
    }
}

pub struct ChannelTransport {
    name: String,
    capabilities: TransportCapabilities,
    open_error: Option<String>,
    is_open: bool,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<ChannelRead>>>,
    reader_held: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl ChannelTransport {
    pub fn new(name: impl Into<String>) -> (Self, ChannelFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            name: name.into(),
            capabilities: TransportCapabilities::read_only(),
            open_error: None,
            is_open: false,
            rx: Arc::new(Mutex::new(rx)),
            reader_held: Arc::new(AtomicBool::new(false)),
            releases: Arc::new(AtomicUsize::new(0)),
        };
        (transport, ChannelFeeder { tx })
    }

    pub fn with_capabilities(mut self, capabilities: TransportCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make `open` fail with the given detail.
    pub fn with_open_error(mut self, detail: impl Into<String>) -> Self {
        self.open_error = Some(detail.into());
        self
    }

    /// Counter of reader releases, readable after the transport is handed off.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    fn describe(&self) -> PortDescription {
        PortDescription::named(self.name.clone(), "Channel")
    }

    async fn open(&mut self) -> Result<(), IoError> {
        if let Some(detail) = &self.open_error {
            return Err(IoError::connection(&self.name, detail.clone()));
        }
        self.is_open = true;
        Ok(())
    }

    fn acquire_reader(&mut self) -> Result<Box<dyn TransportReader>, IoError> {
        if !self.is_open {
            return Err(IoError::not_connected(&self.name));
        }
        if self
            .reader_held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(IoError::busy(&self.name));
        }
        Ok(Box::new(ChannelReader {
            name: self.name.clone(),
            rx: self.rx.clone(),
            held: self.reader_held.clone(),
            releases: self.releases.clone(),
        }))
    }

    async fn close(&mut self) -> Result<(), IoError> {
        if self.reader_held.load(Ordering::SeqCst) {
            return Err(IoError::busy(&self.name));
        }
        self.is_open = false;
        Ok(())
    }
}

struct ChannelReader {
    name: String,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<ChannelRead>>>,
    held: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl TransportReader for ChannelReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, IoError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(ChannelRead::Bytes(bytes)) => Ok(Some(bytes)),
            Some(ChannelRead::Break) => Err(IoError::line_break(&self.name)),
            Some(ChannelRead::Failure(detail)) => Err(IoError::read(&self.name, detail)),
            Some(ChannelRead::End) | None => Ok(None),
        }
    }

    async fn release(&mut self) {
        self.release_detached();
    }

    fn release_detached(&mut self) {
        self.held.store(false, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
