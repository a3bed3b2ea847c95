// src/io/serial/reader.rs
//
// Serial port transport backed by the serialport crate.
//
// serialport reads are blocking, so an acquired reader runs a spawn_blocking
// task that polls the port with a short timeout and hands chunks to the async
// side through a channel. Releasing the reader stops that task and awaits it.

use async_trait::async_trait;
use serialport::{DataBits, Parity as SpParity, SerialPort, StopBits};
use std::io::{self, ErrorKind, Read};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::io::{IoError, PortDescription, Transport, TransportCapabilities, TransportReader};
use crate::settings::{Parity, SerialSettings};

const READ_TIMEOUT: Duration = Duration::from_millis(50);
const CHUNK_QUEUE_DEPTH: usize = 64;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;
type ChunkResult = Result<Option<Vec<u8>>, IoError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl SerialConfig {
    pub fn from_settings(port: &str, settings: &SerialSettings) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: settings.baud_rate,
            data_bits: settings.data_bits,
            stop_bits: settings.stop_bits,
            parity: settings.parity,
        }
    }
}

fn to_serialport_parity(p: &Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

// ============================================================================
// Transport
// ============================================================================

pub struct SerialPortTransport {
    config: SerialConfig,
    port: Option<SharedPort>,
    reader_held: Arc<AtomicBool>,
}

impl SerialPortTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            reader_held: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transport for SerialPortTransport {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::read_only()
    }

    fn describe(&self) -> PortDescription {
        serialport::available_ports()
            .ok()
            .and_then(|ports| ports.into_iter().find(|p| p.port_name == self.config.port))
            .map(describe_port)
            .unwrap_or_else(|| PortDescription::named(self.config.port.clone(), "Serial"))
    }

    async fn open(&mut self) -> Result<(), IoError> {
        if self.port.is_some() {
            return Ok(());
        }

        let config = self.config.clone();
        let opened = tokio::task::spawn_blocking(move || {
            serialport::new(&config.port, config.baud_rate)
                .data_bits(to_serialport_data_bits(config.data_bits))
                .stop_bits(to_serialport_stop_bits(config.stop_bits))
                .parity(to_serialport_parity(&config.parity))
                .timeout(READ_TIMEOUT)
                .open()
        })
        .await
        .map_err(|e| IoError::connection(&self.config.port, format!("open task failed: {}", e)))?;

        let port = opened.map_err(|e| IoError::connection(&self.config.port, e.to_string()))?;

        tlog!(
            "[serial] Opened {} at {} baud ({}-{}-{})",
            self.config.port,
            self.config.baud_rate,
            self.config.data_bits,
            match self.config.parity {
                Parity::None => 'N',
                Parity::Odd => 'O',
                Parity::Even => 'E',
            },
            self.config.stop_bits
        );

        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    fn acquire_reader(&mut self) -> Result<Box<dyn TransportReader>, IoError> {
        let port = self
            .port
            .clone()
            .ok_or_else(|| IoError::not_connected(&self.config.port))?;

        if self
            .reader_held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(IoError::busy(&self.config.port));
        }

        let (tx, rx) = mpsc::channel::<ChunkResult>(CHUNK_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));
        let name = self.config.port.clone();
        let thread_stop = stop.clone();
        let task = tokio::task::spawn_blocking(move || run_read_task(name, port, thread_stop, tx));

        Ok(Box::new(SerialPortReader {
            rx,
            stop,
            task: Some(task),
            held: self.reader_held.clone(),
        }))
    }

    async fn close(&mut self) -> Result<(), IoError> {
        if self.reader_held.load(Ordering::SeqCst) {
            return Err(IoError::busy(&self.config.port));
        }
        if self.port.take().is_some() {
            tlog!("[serial] Closed {}", self.config.port);
        }
        Ok(())
    }
}

// ============================================================================
// Reader
// ============================================================================

struct SerialPortReader {
    rx: mpsc::Receiver<ChunkResult>,
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    held: Arc<AtomicBool>,
}

#[async_trait]
impl TransportReader for SerialPortReader {
    async fn read_chunk(&mut self) -> ChunkResult {
        // Task gone without a final message: treat as end of stream
        self.rx.recv().await.unwrap_or(Ok(None))
    }

    async fn release(&mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tlog!("[serial] Read task panicked: {:?}", e);
            }
        }
        self.held.store(false, Ordering::SeqCst);
    }

    fn release_detached(&mut self) {
        self.signal_stop();
        // The task exits after its current read times out
        self.task = None;
        self.held.store(false, Ordering::SeqCst);
    }
}

impl SerialPortReader {
    fn signal_stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Unblock a task waiting on a full queue
        self.rx.close();
    }
}

/// Map one blocking read onto the chunk stream. `None` is an idle poll.
///
/// `Interrupted` is reported as a break condition, `Ok(0)` ends the stream and
/// any other error is fatal.
fn classify_read(name: &str, result: io::Result<usize>, buf: &[u8]) -> Option<ChunkResult> {
    match result {
        Ok(0) => Some(Ok(None)),
        Ok(n) => Some(Ok(Some(buf[..n].to_vec()))),
        Err(ref e) if e.kind() == ErrorKind::TimedOut => None,
        Err(ref e) if e.kind() == ErrorKind::Interrupted => Some(Err(IoError::line_break(name))),
        Err(e) => Some(Err(IoError::read(name, e.to_string()))),
    }
}

/// Blocking read loop, runs until stopped, end of stream or a fatal error.
fn run_read_task(name: String, port: SharedPort, stop: Arc<AtomicBool>, tx: mpsc::Sender<ChunkResult>) {
    let mut buf = [0u8; 256];

    while !stop.load(Ordering::SeqCst) {
        let read_result = match port.lock() {
            Ok(mut port_guard) => port_guard.read(&mut buf),
            Err(e) => {
                let _ = tx.blocking_send(Err(IoError::read(&name, format!("Port mutex poisoned: {}", e))));
                return;
            }
        };

        let Some(outcome) = classify_read(&name, read_result, &buf) else {
            continue;
        };
        let last = matches!(outcome, Ok(None)) || matches!(&outcome, Err(e) if e.is_fatal());

        if tx.blocking_send(outcome).is_err() || last {
            return;
        }
    }
}

// ============================================================================
// Port Listing
// ============================================================================

fn describe_port(p: serialport::SerialPortInfo) -> PortDescription {
    let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
        serialport::SerialPortType::UsbPort(info) => (
            "USB".to_string(),
            info.manufacturer,
            info.product,
            info.serial_number,
            Some(info.vid),
            Some(info.pid),
        ),
        serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None, None),
        serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
        serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None, None),
    };
    PortDescription {
        port_name: p.port_name,
        port_type,
        manufacturer,
        product,
        serial_number,
        vid,
        pid,
    }
}

/// List available serial ports
///
/// On macOS only /dev/cu.* devices are listed; the /dev/tty.* twins block on
/// open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<PortDescription>, String> {
    let ports = serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(describe_port)
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
