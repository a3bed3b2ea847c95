// src/io/types.rs
//
// Messages pushed from the read task to the consumer.

use serde::Serialize;

use super::PipelineState;
use crate::legacy_hex::DecodedLine;

/// Why a read session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The transport signalled end of stream
    Complete,
    /// Cancelled by `disconnect`
    Stopped,
    /// Fatal read error
    Error,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Complete => "complete",
            EndReason::Stopped => "stopped",
            EndReason::Error => "error",
        }
    }
}

/// Payload emitted once when a read session ends
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamEnded {
    pub reason: EndReason,
    /// Error text for `EndReason::Error`
    pub message: Option<String>,
    /// Frames decoded during the session
    pub frames: u64,
}

/// Events delivered in order through the pipeline channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    /// A complete frame decoded from one line; apply with `Bitmap::replace_with`
    Frame(DecodedLine),
    /// A break condition was absorbed and reading continues
    Break { message: String },
    Ended(StreamEnded),
}
