// src/codec/frame64.rs
//
// 64-byte legacy frame: 16 rows x 4 bytes, each row the little-endian
// serialization of its 32-bit value (column x = bit x).

use super::FrameCodec;
use crate::bitmap::{Bitmap, ROWS};

pub const FRAME64_LEN: usize = 64;
const BYTES_PER_ROW: usize = 4;

/// Codec for the 64-byte layout. Encode and decode are exact inverses.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frame64Codec;

impl FrameCodec for Frame64Codec {
    type Raw = [u8];
    type Encoded = Vec<u8>;

    fn encode(&self, bitmap: &Bitmap) -> Vec<u8> {
        encode_frame64(bitmap)
    }

    fn decode(&self, raw: &[u8]) -> Bitmap {
        decode_frame64(raw)
    }
}

pub fn encode_frame64(bitmap: &Bitmap) -> Vec<u8> {
    bitmap.rows().iter().flat_map(|row| row.to_le_bytes()).collect()
}

/// Decode 64 bytes into a bitmap. Missing bytes read as zero, extra bytes are ignored.
pub fn decode_frame64(bytes: &[u8]) -> Bitmap {
    let mut rows = [0u32; ROWS];
    for (y, value) in rows.iter_mut().enumerate() {
        let mut le = [0u8; BYTES_PER_ROW];
        for (i, slot) in le.iter_mut().enumerate() {
            *slot = bytes.get(y * BYTES_PER_ROW + i).copied().unwrap_or(0);
        }
        *value = u32::from_le_bytes(le);
    }
    Bitmap::from_row_values(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_serialization_is_little_endian() {
        let mut bitmap = Bitmap::new();
        bitmap.paint(0, 0, true);
        bitmap.paint(0, 9, true);
        bitmap.paint(0, 31, true);

        let bytes = encode_frame64(&bitmap);
        assert_eq!(bytes.len(), FRAME64_LEN);
        assert_eq!(&bytes[0..4], &[0x01, 0x02, 0x00, 0x80]);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_exact_roundtrip() {
        let patterns = [
            Bitmap::new(),
            Bitmap::from_fn(|_, _| true),
            Bitmap::from_fn(|r, c| r == c / 2),
            Bitmap::from_fn(|r, c| (r * 31 + c * 17) % 11 < 4),
        ];
        for bitmap in patterns {
            assert_eq!(decode_frame64(&encode_frame64(&bitmap)), bitmap);
        }
    }

    #[test]
    fn test_decode_pads_and_truncates() {
        let bitmap = decode_frame64(&[0xFE, 0x7F, 0xE0, 0x1F, 0x01]);
        assert_eq!(bitmap.row_value(0), 0x1FE0_7FFE);
        assert_eq!(bitmap.row_value(1), 0x0000_0001);
        assert_eq!(bitmap.row_value(2), 0);

        let mut long = vec![0xFF; FRAME64_LEN];
        long.extend_from_slice(&[0x00; 16]);
        assert_eq!(decode_frame64(&long), Bitmap::from_fn(|_, _| true));
        assert!(decode_frame64(&[]).is_blank());
    }
}
