// src/legacy_hex.rs
//
// Parsing of hex text lines as sent by the LED firmware tools.
//
// Two line styles are in use:
// - C array literals: "{ 0x00, 0x0F, ... }," (one `0xNN` per byte)
// - legacy hex text: whitespace-separated tokens whose bytes may have lost
//   their leading zero digit, e.g. "FE7FE01F 0 1 801"
//
// There is no format tag. A line yielding 128 or more bytes is a 128-byte
// LED_Display frame (pair-swapped), anything shorter is a 64-byte frame.

use serde::Serialize;

use crate::bitmap::Bitmap;
use crate::codec::{decode_frame128, decode_frame64, FRAME128_LEN};

// ============================================================================
// Types
// ============================================================================

/// Which binary layout a line's bytes were decoded as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    Frame128,
    Frame64,
}

/// Which tokenizer produced a line's bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    CArray,
    LegacyHex,
}

/// A text line decoded into a complete frame
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedLine {
    pub bitmap: Bitmap,
    pub source: LineSource,
    pub layout: FrameLayout,
    /// Number of bytes the tokenizer produced before padding/truncation
    pub byte_count: usize,
    /// The line as received, without its terminator
    pub raw: String,
}

// ============================================================================
// Tokenizers
// ============================================================================

fn hex_digit(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Tokenize legacy hex text into bytes.
///
/// Per whitespace-separated token, non-hex characters are dropped (a token
/// left empty is skipped). "0" alone is one zero byte. Otherwise digits are
/// taken two at a time; a single trailing digit becomes its own byte 0x0-0xF.
pub fn tokenize_legacy_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::new();

    for token in text.split_whitespace() {
        let digits: Vec<u8> = token.bytes().filter_map(hex_digit).collect();
        if digits.is_empty() {
            continue;
        }
        if digits == [0] {
            bytes.push(0x00);
            continue;
        }
        for pair in digits.chunks(2) {
            match *pair {
                [hi, lo] => bytes.push((hi << 4) | lo),
                [lo] => bytes.push(lo),
                _ => {}
            }
        }
    }

    bytes
}

/// Collect every `0xNN` literal (exactly two hex digits) in order.
///
/// A literal must not be glued to a preceding identifier character and must
/// not run on into a third hex digit, so "0x123" or "a0x12" do not count.
pub fn scan_c_array_literals(text: &str) -> Vec<u8> {
    let b = text.as_bytes();
    let mut bytes = Vec::new();
    let mut i = 0;

    while i + 4 <= b.len() {
        let starts_literal = b[i] == b'0'
            && (b[i + 1] == b'x' || b[i + 1] == b'X')
            && (i == 0 || !b[i - 1].is_ascii_alphanumeric());
        if starts_literal {
            if let (Some(hi), Some(lo)) = (hex_digit(b[i + 2]), hex_digit(b[i + 3])) {
                let run_on = b.get(i + 4).map_or(false, |c| c.is_ascii_hexdigit());
                if !run_on {
                    bytes.push((hi << 4) | lo);
                    i += 4;
                    continue;
                }
            }
        }
        i += 1;
    }

    bytes
}

// ============================================================================
// Classification
// ============================================================================

pub fn classify_bytes(bytes: &[u8]) -> FrameLayout {
    if bytes.len() >= FRAME128_LEN {
        FrameLayout::Frame128
    } else {
        FrameLayout::Frame64
    }
}

/// Decode bytes using the length-driven layout rule.
pub fn decode_classified(bytes: &[u8]) -> Bitmap {
    match classify_bytes(bytes) {
        FrameLayout::Frame128 => decode_frame128(bytes, true),
        FrameLayout::Frame64 => decode_frame64(bytes),
    }
}

/// Tokenize a legacy hex line and decode it as a 128- or 64-byte frame.
pub fn classify_and_decode_line(text: &str) -> Bitmap {
    decode_classified(&tokenize_legacy_line(text))
}

/// Decode one received line.
///
/// C array literals win whenever at least one is present; otherwise the line
/// is read as legacy hex. Blank lines and lines with no hex digits (status
/// chatter such as `--` or `OK`) yield nothing.
pub fn decode_line(line: &str) -> Option<DecodedLine> {
    let raw = line.trim_end_matches(&['\r', '\n'][..]);
    if raw.trim().is_empty() {
        return None;
    }

    let literals = scan_c_array_literals(raw);
    let (bytes, source) = if literals.is_empty() {
        let bytes = tokenize_legacy_line(raw);
        if bytes.is_empty() {
            return None;
        }
        (bytes, LineSource::LegacyHex)
    } else {
        (literals, LineSource::CArray)
    };

    Some(DecodedLine {
        bitmap: decode_classified(&bytes),
        source,
        layout: classify_bytes(&bytes),
        byte_count: bytes.len(),
        raw: raw.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_frame128, encode_frame64, Frame128Options};

    #[test]
    fn test_tokenize_single_zero() {
        assert_eq!(tokenize_legacy_line("0"), vec![0x00]);
    }

    #[test]
    fn test_tokenize_full_token() {
        assert_eq!(tokenize_legacy_line("FE7FE01F"), vec![0xFE, 0x7F, 0xE0, 0x1F]);
    }

    #[test]
    fn test_tokenize_dangling_digit_per_token() {
        assert_eq!(tokenize_legacy_line("1 801"), vec![0x01, 0x08, 0x01]);
        assert_eq!(tokenize_legacy_line("abc"), vec![0xAB, 0x0C]);
    }

    #[test]
    fn test_tokenize_strips_junk() {
        assert_eq!(tokenize_legacy_line("  zz, fe; -- 0\r\n"), vec![0xFE, 0x00]);
        assert!(tokenize_legacy_line("").is_empty());
        assert!(tokenize_legacy_line("  \t ").is_empty());
        // "00" is not the literal "0": it is a two-digit byte
        assert_eq!(tokenize_legacy_line("00"), vec![0x00]);
        assert_eq!(tokenize_legacy_line("000"), vec![0x00, 0x00]);
    }

    #[test]
    fn test_scan_c_array_literals() {
        assert_eq!(scan_c_array_literals("{ 0x00, 0x0F, 0XAb },"), vec![0x00, 0x0F, 0xAB]);
        assert!(scan_c_array_literals("0x123 a0x12 0x1").is_empty());
        assert_eq!(scan_c_array_literals("0x12,0x34"), vec![0x12, 0x34]);
    }

    #[test]
    fn test_classification_by_length() {
        assert_eq!(classify_bytes(&[0u8; 127]), FrameLayout::Frame64);
        assert_eq!(classify_bytes(&[0u8; 128]), FrameLayout::Frame128);
        assert_eq!(classify_bytes(&[0u8; 300]), FrameLayout::Frame128);
    }

    #[test]
    fn test_legacy_line_decodes_as_frame64() {
        let bitmap = Bitmap::from_fn(|r, c| r % 2 == 0 && c < 20);
        let text = encode_frame64(&bitmap)
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(classify_and_decode_line(&text), bitmap);
    }

    #[test]
    fn test_long_legacy_line_decodes_as_frame128() {
        let bitmap = Bitmap::from_fn(|r, c| (r + c) % 5 == 0);
        let text = encode_frame128(&bitmap, Frame128Options::default())
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(classify_and_decode_line(&text), bitmap);
    }

    #[test]
    fn test_c_array_path_wins() {
        // Legacy parsing would give many bytes; a single literal forces the C array path
        let line = "DEADBEEF 0x01 CAFEBABE";
        let decoded = decode_line(line).unwrap();
        assert_eq!(decoded.source, LineSource::CArray);
        assert_eq!(decoded.byte_count, 1);
        assert_eq!(decoded.layout, FrameLayout::Frame64);
        assert_eq!(decoded.bitmap.row_value(0), 0x01);
        assert_eq!(decoded.raw, line);
    }

    #[test]
    fn test_decode_line_legacy_and_blank() {
        let decoded = decode_line("FE7FE01F\r").unwrap();
        assert_eq!(decoded.source, LineSource::LegacyHex);
        assert_eq!(decoded.raw, "FE7FE01F");
        assert_eq!(decoded.bitmap.row_value(0), 0x1FE0_7FFE);

        assert!(decode_line("").is_none());
        assert!(decode_line("   \r").is_none());
    }

    #[test]
    fn test_line_without_hex_digits_is_skipped() {
        assert!(decode_line("--").is_none());
        assert!(decode_line("-- ++ ::\r").is_none());

        // A lone zero is still a (blank) frame
        let decoded = decode_line("0").unwrap();
        assert!(decoded.bitmap.is_blank());
        assert_eq!(decoded.byte_count, 1);
    }
}
