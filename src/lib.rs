// src/lib.rs
//
// leddot: codecs, legacy text parsing and serial ingestion for 16x32 LED
// matrix bitmaps.

#[macro_use]
pub mod logging;

pub mod bitmap;
pub mod codec;
pub mod io;
pub mod legacy_hex;
pub mod settings;

pub use bitmap::{Bitmap, COLS, ROWS};
pub use codec::{Frame128Options, FrameCodec, TextFormat};
pub use io::{IoError, PipelineEvent, PipelineState, SerialPipeline};
pub use legacy_hex::{decode_line, DecodedLine, FrameLayout, LineSource};
pub use settings::AppSettings;
