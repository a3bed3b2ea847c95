// src/io/pipeline.rs
//
// Serial ingestion pipeline: Disconnected -> Connecting -> Connected -> Disconnected.
//
// One read task per connected transport. The task owns the exclusive reader
// (via ReaderLease), frames bytes into lines, decodes each line in arrival
// order and pushes the results to the consumer over a channel. Decoded frames
// are complete bitmaps; the consumer applies them with `Bitmap::replace_with`.
//
// Cancellation is checked at every await of the next chunk. Whatever ends the
// loop (end of stream, fatal read error, cancellation) the reader is released
// before the state returns to Disconnected, and the transport is only closed
// after that.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::framer::LineFramer;
use super::types::{EndReason, PipelineEvent, StreamEnded};
use super::{IoError, PipelineState, ReaderLease, Transport};
use crate::bitmap::Bitmap;
use crate::legacy_hex::decode_line;

// ============================================================================
// Pipeline
// ============================================================================

pub struct SerialPipeline {
    state_tx: Arc<watch::Sender<PipelineState>>,
    events: mpsc::UnboundedSender<PipelineEvent>,
    cancel_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    transport: Option<Box<dyn Transport>>,
    last_line: Arc<Mutex<Option<String>>>,
    frames: Arc<AtomicU64>,
}

impl SerialPipeline {
    /// Create an idle pipeline and the receiver its events are delivered on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(PipelineState::Disconnected);
        let pipeline = Self {
            state_tx: Arc::new(state_tx),
            events,
            cancel_tx: None,
            task: None,
            transport: None,
            last_line: Arc::new(Mutex::new(None)),
            frames: Arc::new(AtomicU64::new(0)),
        };
        (pipeline, events_rx)
    }

    pub fn state(&self) -> PipelineState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Raw text of the most recently decoded line.
    pub fn last_line(&self) -> Option<String> {
        self.last_line.lock().ok().and_then(|guard| guard.clone())
    }

    /// Frames decoded since the pipeline was created.
    pub fn frames_decoded(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Open `transport`, take its reader and start the read task.
    ///
    /// A transport that cannot read on this runtime is rejected with
    /// `IoError::Unsupported` before any state change.
    pub async fn connect(&mut self, mut transport: Box<dyn Transport>) -> Result<(), IoError> {
        let port = transport.describe().port_name;

        if !transport.capabilities().can_read {
            return Err(IoError::unsupported(&port, "transport cannot read on this runtime"));
        }
        if self.state() != PipelineState::Disconnected {
            return Err(IoError::busy(&port));
        }

        // A previous session that ended on its own still holds its transport
        if self.transport.is_some() || self.task.is_some() {
            if let Err(e) = self.disconnect().await {
                tlog!("[pipeline] Failed to close previous transport: {}", e);
            }
        }

        set_state(&self.state_tx, &self.events, PipelineState::Connecting(port.clone()));

        if let Err(e) = transport.open().await {
            tlog!("[pipeline] {}", e);
            set_state(&self.state_tx, &self.events, PipelineState::Disconnected);
            return Err(e);
        }

        let reader = match transport.acquire_reader() {
            Ok(reader) => reader,
            Err(e) => {
                tlog!("[pipeline] {}", e);
                if let Err(close_err) = transport.close().await {
                    tlog!("[pipeline] {}", close_err);
                }
                set_state(&self.state_tx, &self.events, PipelineState::Disconnected);
                return Err(e);
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        set_state(&self.state_tx, &self.events, PipelineState::Connected(port.clone()));

        let ctx = ReadContext {
            port,
            events: self.events.clone(),
            state_tx: self.state_tx.clone(),
            last_line: self.last_line.clone(),
            frames: self.frames.clone(),
        };
        self.task = Some(tokio::spawn(run_read_loop(ReaderLease::new(reader), cancel_rx, ctx)));
        self.cancel_tx = Some(cancel_tx);
        self.transport = Some(transport);

        Ok(())
    }

    /// Stop the read task and close the transport. Safe to call repeatedly.
    pub async fn disconnect(&mut self) -> Result<(), IoError> {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }

        // The reader is released when the task finishes, so wait for it
        // before closing the transport underneath it.
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tlog!("[pipeline] Read task panicked: {:?}", e);
            }
        }

        let result = match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        };

        if self.state() != PipelineState::Disconnected {
            set_state(&self.state_tx, &self.events, PipelineState::Disconnected);
        }

        result
    }
}

impl Drop for SerialPipeline {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }
    }
}

/// Apply a pipeline event to a live bitmap. Returns true when it was replaced.
pub fn apply_event(bitmap: &mut Bitmap, event: &PipelineEvent) -> bool {
    match event {
        PipelineEvent::Frame(decoded) => {
            bitmap.replace_with(&decoded.bitmap);
            true
        }
        _ => false,
    }
}

fn set_state(
    state_tx: &watch::Sender<PipelineState>,
    events: &mpsc::UnboundedSender<PipelineEvent>,
    state: PipelineState,
) {
    tlog!("[pipeline] State -> {:?}", state);
    state_tx.send_replace(state.clone());
    let _ = events.send(PipelineEvent::StateChanged(state));
}

// ============================================================================
// Read Loop
// ============================================================================

struct ReadContext {
    port: String,
    events: mpsc::UnboundedSender<PipelineEvent>,
    state_tx: Arc<watch::Sender<PipelineState>>,
    last_line: Arc<Mutex<Option<String>>>,
    frames: Arc<AtomicU64>,
}

impl ReadContext {
    /// Decode one line and publish the frame. Returns true if a frame was produced.
    fn handle_line(&self, line: &str) -> bool {
        let Some(decoded) = decode_line(line) else {
            return false;
        };

        if let Ok(mut guard) = self.last_line.lock() {
            *guard = Some(decoded.raw.clone());
        }
        self.frames.fetch_add(1, Ordering::Relaxed);
        let _ = self.events.send(PipelineEvent::Frame(decoded));
        true
    }
}

enum Wake {
    CancelSignal,
    CancelDropped,
    Read(Result<Option<Vec<u8>>, IoError>),
}

async fn run_read_loop(mut lease: ReaderLease, mut cancel_rx: watch::Receiver<bool>, ctx: ReadContext) {
    let mut framer = LineFramer::new();
    let mut session_frames: u64 = 0;

    tlog!("[pipeline] Reading from {}", ctx.port);

    let (reason, message) = loop {
        if *cancel_rx.borrow() {
            break (EndReason::Stopped, None);
        }

        let wake = tokio::select! {
            biased;
            changed = cancel_rx.changed() => match changed {
                Ok(()) => Wake::CancelSignal,
                Err(_) => Wake::CancelDropped,
            },
            read = lease.read_chunk() => Wake::Read(read),
        };

        match wake {
            Wake::CancelSignal => continue,
            Wake::CancelDropped => break (EndReason::Stopped, None),
            Wake::Read(Ok(Some(chunk))) => {
                for line in framer.feed(&chunk) {
                    if ctx.handle_line(&line) {
                        session_frames += 1;
                    }
                }
            }
            Wake::Read(Ok(None)) => {
                // Last line may lack its terminator
                if let Some(line) = framer.flush() {
                    if ctx.handle_line(&line) {
                        session_frames += 1;
                    }
                }
                break (EndReason::Complete, None);
            }
            Wake::Read(Err(e)) if e.is_break() => {
                tlog!("[pipeline] {} (continuing)", e);
                let _ = ctx.events.send(PipelineEvent::Break {
                    message: e.to_string(),
                });
            }
            Wake::Read(Err(e)) => {
                tlog!("[pipeline] {}", e);
                break (EndReason::Error, Some(e.to_string()));
            }
        }
    };

    // Release the reader before anyone can observe Disconnected
    lease.release().await;

    tlog!(
        "[pipeline] Read loop for {} ended ({}, {} frames)",
        ctx.port,
        reason.as_str(),
        session_frames
    );

    set_state(&ctx.state_tx, &ctx.events, PipelineState::Disconnected);
    let _ = ctx.events.send(PipelineEvent::Ended(StreamEnded {
        reason,
        message,
        frames: session_frames,
    }));
}

// ============================================================================
// Tests
// ============================================================================
