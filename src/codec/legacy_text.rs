// src/codec/legacy_text.rs
//
// Fixed-width legacy .fnt text: the 64-byte frame rendered as exactly 128
// ASCII characters, two per byte. Bytes below 0x10 are one hex digit plus a
// space ("0 ", "A "), larger bytes are two hex digits ("1F").

use super::frame64::{decode_frame64, encode_frame64, FRAME64_LEN};
use super::FrameCodec;
use crate::bitmap::Bitmap;
use crate::legacy_hex::classify_and_decode_line;

pub const LEGACY_TEXT_LEN: usize = FRAME64_LEN * 2;

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Clone, Copy, Debug, Default)]
pub struct LegacyTextCodec;

impl FrameCodec for LegacyTextCodec {
    type Raw = str;
    type Encoded = String;

    fn encode(&self, bitmap: &Bitmap) -> String {
        encode_legacy_style_text(bitmap)
    }

    fn decode(&self, raw: &str) -> Bitmap {
        decode_legacy_style_text(raw)
    }
}

fn push_cell(out: &mut String, byte: u8) {
    if byte < 0x10 {
        out.push(HEX_CHARS[byte as usize] as char);
        out.push(' ');
    } else {
        out.push(HEX_CHARS[(byte >> 4) as usize] as char);
        out.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
}

/// Always exactly 128 characters, no line terminator.
pub fn encode_legacy_style_text(bitmap: &Bitmap) -> String {
    let mut out = String::with_capacity(LEGACY_TEXT_LEN);
    for byte in encode_frame64(bitmap) {
        push_cell(&mut out, byte);
    }
    out
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn parse_cell(cell: &[u8]) -> u8 {
    match (hex_value(cell[0]), cell[1]) {
        (Some(hi), b' ') => hi,
        (Some(hi), lo) => match hex_value(lo) {
            Some(lo) => (hi << 4) | lo,
            None => 0,
        },
        (None, _) => 0,
    }
}

/// Decode legacy fixed-width text.
///
/// A line of exactly 128 ASCII characters is read cell by cell, which is the
/// exact inverse of `encode_legacy_style_text`. Anything else goes through the
/// generic legacy hex line parser.
pub fn decode_legacy_style_text(text: &str) -> Bitmap {
    let line = text.trim_end_matches(&['\r', '\n'][..]);
    if line.len() != LEGACY_TEXT_LEN || !line.is_ascii() {
        return classify_and_decode_line(line);
    }

    let bytes: Vec<u8> = line.as_bytes().chunks_exact(2).map(parse_cell).collect();
    decode_frame64(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_zero_space_cells() {
        let text = encode_legacy_style_text(&Bitmap::new());
        assert_eq!(text.len(), LEGACY_TEXT_LEN);
        assert_eq!(text, "0 ".repeat(64));
    }

    #[test]
    fn test_one_and_two_digit_cells() {
        let mut rows = [0u32; 16];
        rows[0] = u32::from_le_bytes([0x0A, 0x10, 0xFF, 0x01]);
        let text = encode_legacy_style_text(&Bitmap::from_row_values(rows));
        assert!(text.starts_with("A 10FF1 0 "));
        assert_eq!(text.len(), LEGACY_TEXT_LEN);
    }

    #[test]
    fn test_fixed_width_decode_is_exact_inverse() {
        let bitmap = Bitmap::from_fn(|r, c| (r * 5 + c) % 9 < 2 || c == 31);
        let text = encode_legacy_style_text(&bitmap);
        assert_eq!(decode_legacy_style_text(&text), bitmap);
        assert_eq!(decode_legacy_style_text(&format!("{}\r\n", text)), bitmap);
    }

    #[test]
    fn test_other_lengths_use_line_parser() {
        // Not 128 characters: tokenized as legacy hex, 4 bytes -> 64-byte layout
        let bitmap = decode_legacy_style_text("FE7FE01F");
        assert_eq!(bitmap.row_value(0), 0x1FE0_7FFE);
        assert!(decode_legacy_style_text("").is_blank());
    }
}
