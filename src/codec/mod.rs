// src/codec/mod.rs
//
// Frame codec trait and the binary/text layouts understood by the LED firmware.
//
// Each layout is implemented in its own module:
// - frame128.rs    - 16 rows x 8 nibble bytes, optional pair-swap
// - frame64.rs     - 16 rows x 4 little-endian bytes
// - token_line.rs  - 16 whitespace-separated hex tokens
// - legacy_text.rs - 128-character fixed-width legacy text
// - export.rs      - C array / 0-1 matrix export and file contents
//
// Decoding never fails: short input is zero-padded, long input truncated,
// junk characters skipped. Every decode yields a complete Bitmap.

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;

pub mod export;
pub mod frame128;
pub mod frame64;
pub mod legacy_text;
pub mod token_line;

pub use export::{export_c_array, export_matrix, export_text, file_contents, CArrayLayout};
pub use frame128::{decode_frame128, encode_frame128, Frame128Codec, FRAME128_LEN, PAIR_SWAP};
pub use frame64::{decode_frame64, encode_frame64, Frame64Codec, FRAME64_LEN};
pub use legacy_text::{decode_legacy_style_text, encode_legacy_style_text, LegacyTextCodec, LEGACY_TEXT_LEN};
pub use token_line::{decode_token_line, encode_token_line, encode_token_line_with, TokenLineCodec, TokenLineDialect};

// ============================================================================
// Frame Codec Trait
// ============================================================================

/// Trait for bitmap codecs.
///
/// The associated types define the layout-specific raw and encoded forms.
/// Unlike a wire protocol codec, decode is total: malformed input degrades to
/// a best-effort (possibly partly blank) frame instead of an error.
pub trait FrameCodec {
    /// Input accepted by `decode` (byte slice or text)
    type Raw: ?Sized;

    /// Output produced by `encode`
    type Encoded;

    fn encode(&self, bitmap: &Bitmap) -> Self::Encoded;

    fn decode(&self, raw: &Self::Raw) -> Bitmap;
}

// ============================================================================
// Options and Formats
// ============================================================================

/// Export options for the 128-byte layout.
///
/// `reverse_nibble` and `invert_bits` only apply on export; decoding ignores
/// them, so a frame exported with either flag does not round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame128Options {
    #[serde(default = "default_swap_pairs")]
    pub swap_pairs: bool,
    #[serde(default)]
    pub reverse_nibble: bool,
    #[serde(default)]
    pub invert_bits: bool,
}

fn default_swap_pairs() -> bool {
    true
}

impl Default for Frame128Options {
    fn default() -> Self {
        Self {
            swap_pairs: true,
            reverse_nibble: false,
            invert_bits: false,
        }
    }
}

/// Named text dialects a bitmap can be exported as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// "0 or 8-hex" token line
    #[default]
    TokenLine,
    /// Token line with every row as 8 hex digits
    TokenLinePadded,
    /// 128-character fixed-width legacy text
    LegacyText,
    /// 128 `0xNN` literals on one line
    CArray,
    /// 128 `0xNN` literals as a C array declaration, one row per line
    CArrayBlock,
    /// Nested 0/1 array
    Matrix,
}

impl TextFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextFormat::TokenLine => "token_line",
            TextFormat::TokenLinePadded => "token_line_padded",
            TextFormat::LegacyText => "legacy_text",
            TextFormat::CArray => "c_array",
            TextFormat::CArrayBlock => "c_array_block",
            TextFormat::Matrix => "matrix",
        }
    }
}

impl std::str::FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "token_line" | "fnt" => Ok(TextFormat::TokenLine),
            "token_line_padded" => Ok(TextFormat::TokenLinePadded),
            "legacy_text" | "legacy" => Ok(TextFormat::LegacyText),
            "c_array" => Ok(TextFormat::CArray),
            "c_array_block" => Ok(TextFormat::CArrayBlock),
            "matrix" => Ok(TextFormat::Matrix),
            other => Err(format!("Unknown text format: {}", other)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bitmap {
        Bitmap::from_fn(|r, c| (r * 7 + c * 3) % 5 == 0)
    }

    #[test]
    fn test_trait_objects_agree_with_free_functions() {
        let bitmap = sample();
        let options = Frame128Options::default();

        assert_eq!(Frame128Codec { options }.encode(&bitmap), encode_frame128(&bitmap, options));
        assert_eq!(Frame64Codec.encode(&bitmap), encode_frame64(&bitmap));
        assert_eq!(
            TokenLineCodec { dialect: TokenLineDialect::Compact }.encode(&bitmap),
            encode_token_line(&bitmap)
        );
        assert_eq!(LegacyTextCodec.encode(&bitmap), encode_legacy_style_text(&bitmap));
    }

    #[test]
    fn test_default_options_swap_pairs_only() {
        let options = Frame128Options::default();
        assert!(options.swap_pairs);
        assert!(!options.reverse_nibble);
        assert!(!options.invert_bits);

        let parsed: Frame128Options = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_text_format_names() {
        for format in [
            TextFormat::TokenLine,
            TextFormat::TokenLinePadded,
            TextFormat::LegacyText,
            TextFormat::CArray,
            TextFormat::CArrayBlock,
            TextFormat::Matrix,
        ] {
            assert_eq!(format.as_str().parse::<TextFormat>().unwrap(), format);
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format.as_str()));
        }
        assert_eq!("c-array".parse::<TextFormat>().unwrap(), TextFormat::CArray);
        assert!("bmp".parse::<TextFormat>().is_err());
    }
}
