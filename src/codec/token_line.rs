// src/codec/token_line.rs
//
// .fnt token line: 16 space-separated tokens, one per row.
//
// A token is the row's little-endian bytes as hex (byte0 byte1 byte2 byte3,
// two digits each, uppercase), e.g. "FE7FE01F". The compact dialect writes a
// blank row as "0"; the padded dialect writes "00000000".

use serde::{Deserialize, Serialize};

use super::FrameCodec;
use crate::bitmap::{Bitmap, ROWS};

const TOKEN_DIGITS: usize = 8;

/// Token line dialects written by different revisions of the editor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLineDialect {
    /// Blank rows as "0", others as 8 hex digits
    #[default]
    Compact,
    /// Every row as 8 hex digits
    Padded,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokenLineCodec {
    pub dialect: TokenLineDialect,
}

impl FrameCodec for TokenLineCodec {
    type Raw = str;
    type Encoded = String;

    fn encode(&self, bitmap: &Bitmap) -> String {
        encode_token_line_with(bitmap, self.dialect)
    }

    fn decode(&self, raw: &str) -> Bitmap {
        decode_token_line(raw)
    }
}

fn row_token(value: u32, dialect: TokenLineDialect) -> String {
    if value == 0 && dialect == TokenLineDialect::Compact {
        return "0".to_string();
    }
    hex::encode_upper(value.to_le_bytes())
}

/// Compact token line, e.g. "0 0 FE7FE01F 0 ...".
pub fn encode_token_line(bitmap: &Bitmap) -> String {
    encode_token_line_with(bitmap, TokenLineDialect::Compact)
}

pub fn encode_token_line_with(bitmap: &Bitmap, dialect: TokenLineDialect) -> String {
    bitmap
        .rows()
        .iter()
        .map(|&value| row_token(value, dialect))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one token into a row value. Non-hex characters are dropped; a token
/// left empty (or exactly "0") is a blank row. Shorter tokens are zero-padded
/// on the left, longer ones cut to their first 8 digits.
fn parse_row_token(token: &str) -> u32 {
    let digits: String = token.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if digits.is_empty() || digits == "0" {
        return 0;
    }

    let digits = if digits.len() >= TOKEN_DIGITS {
        digits[..TOKEN_DIGITS].to_string()
    } else {
        format!("{:0>width$}", digits, width = TOKEN_DIGITS)
    };

    match hex::decode(&digits) {
        Ok(bytes) if bytes.len() == 4 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => 0,
    }
}

/// Decode a token line of either dialect. Missing rows are blank and tokens
/// past the sixteenth are ignored. A trailing CR/LF is accepted.
pub fn decode_token_line(text: &str) -> Bitmap {
    let mut rows = [0u32; ROWS];
    for (slot, token) in rows.iter_mut().zip(text.split_whitespace()) {
        *slot = parse_row_token(token);
    }
    Bitmap::from_row_values(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_bitmap_is_sixteen_zeros() {
        assert_eq!(
            encode_token_line(&Bitmap::new()),
            "0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0"
        );
        let padded = encode_token_line_with(&Bitmap::new(), TokenLineDialect::Padded);
        assert_eq!(padded.split(' ').count(), 16);
        assert!(padded.split(' ').all(|t| t == "00000000"));
    }

    #[test]
    fn test_row_token_byte_order() {
        let mut rows = [0u32; ROWS];
        rows[2] = 0x1FE0_7FFE;
        let line = encode_token_line(&Bitmap::from_row_values(rows));
        assert_eq!(line, "0 0 FE7FE01F 0 0 0 0 0 0 0 0 0 0 0 0 0");
        assert_eq!(decode_token_line(&line).row_value(2), 0x1FE0_7FFE);
    }

    #[test]
    fn test_roundtrip_both_dialects() {
        let bitmap = Bitmap::from_fn(|r, c| (r ^ c) % 3 == 1);
        for dialect in [TokenLineDialect::Compact, TokenLineDialect::Padded] {
            let line = encode_token_line_with(&bitmap, dialect);
            assert_eq!(decode_token_line(&line), bitmap);
        }
    }

    #[test]
    fn test_short_and_long_tokens() {
        // "1" pads to "00000001" -> bytes 00 00 00 01 -> top byte of the row
        let bitmap = decode_token_line("1 123456789A");
        assert_eq!(bitmap.row_value(0), 0x0100_0000);
        assert_eq!(bitmap.row_value(1), u32::from_le_bytes([0x12, 0x34, 0x56, 0x78]));
    }

    #[test]
    fn test_missing_extra_and_junk_tokens() {
        let bitmap = decode_token_line("FF000000\r\n");
        assert_eq!(bitmap.row_value(0), 0xFF);
        assert!((1..ROWS).all(|r| bitmap.row_value(r) == 0));

        let many = vec!["01000000"; 20].join(" ");
        let bitmap = decode_token_line(&many);
        assert!((0..ROWS).all(|r| bitmap.row_value(r) == 1));

        // A junk-only token still occupies its row slot
        let bitmap = decode_token_line("zz 01000000");
        assert_eq!(bitmap.row_value(0), 0);
        assert_eq!(bitmap.row_value(1), 1);

        let bitmap = decode_token_line("0x01,00,00,00");
        assert_eq!(bitmap.row_value(0), u32::from_le_bytes([0x00, 0x10, 0x00, 0x00]));
    }
}
