// src/codec/export.rs
//
// Text exports handed to external sinks (clipboard, file save).
//
// C array output is what firmware sources paste in directly:
//   single line:  { 0x00, 0x0F, ... },
//   block:        static const uint8_t frame0[128] = { ... };
// The 0/1 matrix is a nested array literal, one row per line.

use serde::{Deserialize, Serialize};

use super::frame128::encode_frame128;
use super::legacy_text::encode_legacy_style_text;
use super::token_line::{encode_token_line_with, TokenLineDialect};
use super::{Frame128Options, TextFormat};
use crate::bitmap::{Bitmap, COLS};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CArrayLayout {
    #[default]
    SingleLine,
    Block,
}

fn hex_literal(byte: u8) -> String {
    format!("0x{:02X}", byte)
}

/// Export the 128-byte frame as C hex literals.
pub fn export_c_array(bitmap: &Bitmap, options: Frame128Options, layout: CArrayLayout) -> String {
    let bytes = encode_frame128(bitmap, options);

    match layout {
        CArrayLayout::SingleLine => {
            let flat = bytes.iter().map(|&b| hex_literal(b)).collect::<Vec<_>>().join(", ");
            format!("{{ {} }},", flat)
        }
        CArrayLayout::Block => {
            let lines = bytes
                .chunks(8)
                .map(|row| {
                    let row_hex = row.iter().map(|&b| hex_literal(b)).collect::<Vec<_>>().join(", ");
                    format!("  {}", row_hex)
                })
                .collect::<Vec<_>>();
            format!(
                "// 16 rows x 8 bytes = 128 bytes (LED_Display)\n\
                 // options: swapPairs={}, reverseNibble={}, invertBits={}\n\
                 static const uint8_t frame0[128] = {{\n{}\n}};",
                options.swap_pairs,
                options.reverse_nibble,
                options.invert_bits,
                lines.join(",\n")
            )
        }
    }
}

/// Export as a nested 0/1 array, e.g. `[\n  [0, 1, ...],\n ...\n];`
pub fn export_matrix(bitmap: &Bitmap) -> String {
    let lines = bitmap
        .rows()
        .iter()
        .map(|&value| {
            let cells = (0..COLS)
                .map(|x| ((value >> x) & 1).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("  [{}]", cells)
        })
        .collect::<Vec<_>>();
    format!("[\n{}\n];", lines.join(",\n"))
}

/// Render a bitmap in the given text format, without a line terminator.
pub fn export_text(bitmap: &Bitmap, format: TextFormat, options: Frame128Options) -> String {
    match format {
        TextFormat::TokenLine => encode_token_line_with(bitmap, TokenLineDialect::Compact),
        TextFormat::TokenLinePadded => encode_token_line_with(bitmap, TokenLineDialect::Padded),
        TextFormat::LegacyText => encode_legacy_style_text(bitmap),
        TextFormat::CArray => export_c_array(bitmap, options, CArrayLayout::SingleLine),
        TextFormat::CArrayBlock => export_c_array(bitmap, options, CArrayLayout::Block),
        TextFormat::Matrix => export_matrix(bitmap),
    }
}

/// Text as it should be written to a file. The legacy loader reads 128 bytes
/// and expects CRLF after them; everything else ends with LF.
pub fn file_contents(bitmap: &Bitmap, format: TextFormat, options: Frame128Options) -> String {
    let text = export_text(bitmap, format, options);
    match format {
        TextFormat::LegacyText => format!("{}\r\n", text),
        _ => format!("{}\n", text),
    }
}
