// src/codec/frame128.rs
//
// 128-byte LED_Display frame: 16 rows x 8 bytes.
//
// Each byte carries four horizontally adjacent pixels in its low nibble
// (bit k = pixel k of the group, leftmost pixel in bit 0). The high nibble is
// ignored on decode and always zero on export. The eight bytes of a row may be
// stored in pair-swapped order [1,0,3,2,5,4,7,6].

use super::{Frame128Options, FrameCodec};
use crate::bitmap::{Bitmap, ROWS};

pub const FRAME128_LEN: usize = 128;
const BYTES_PER_ROW: usize = 8;

/// Per-row byte permutation. It is its own inverse.
pub const PAIR_SWAP: [usize; BYTES_PER_ROW] = [1, 0, 3, 2, 5, 4, 7, 6];
const IDENTITY: [usize; BYTES_PER_ROW] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Codec for the 128-byte layout with fixed export options.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frame128Codec {
    pub options: Frame128Options,
}

impl FrameCodec for Frame128Codec {
    type Raw = [u8];
    type Encoded = Vec<u8>;

    fn encode(&self, bitmap: &Bitmap) -> Vec<u8> {
        encode_frame128(bitmap, self.options)
    }

    fn decode(&self, raw: &[u8]) -> Bitmap {
        decode_frame128(raw, self.options.swap_pairs)
    }
}

fn byte_order(swap_pairs: bool) -> &'static [usize; BYTES_PER_ROW] {
    if swap_pairs {
        &PAIR_SWAP
    } else {
        &IDENTITY
    }
}

/// Mirror the four bits of a nibble (bit 0 <-> bit 3, bit 1 <-> bit 2).
fn reverse_nibble(n: u8) -> u8 {
    ((n & 0b0001) << 3) | ((n & 0b0010) << 1) | ((n & 0b0100) >> 1) | ((n & 0b1000) >> 3)
}

/// Encode a bitmap as exactly 128 bytes.
pub fn encode_frame128(bitmap: &Bitmap, options: Frame128Options) -> Vec<u8> {
    let order = byte_order(options.swap_pairs);
    let mut out = Vec::with_capacity(FRAME128_LEN);

    for &row in bitmap.rows() {
        let mut nibbles = [0u8; BYTES_PER_ROW];
        for (n, slot) in nibbles.iter_mut().enumerate() {
            let mut nib = ((row >> (n * 4)) & 0x0F) as u8;
            if options.reverse_nibble {
                nib = reverse_nibble(nib);
            }
            if options.invert_bits {
                nib ^= 0x0F;
            }
            *slot = nib;
        }
        out.extend(order.iter().map(|&idx| nibbles[idx]));
    }

    out
}

/// Decode 128 bytes (zero-padded or truncated) into a bitmap.
///
/// Only the pair-swap is undone. Nibble reversal and inversion are export-only
/// and are not reversed here.
pub fn decode_frame128(bytes: &[u8], swap_pairs: bool) -> Bitmap {
    let order = byte_order(swap_pairs);
    let mut rows = [0u32; ROWS];

    for (y, value) in rows.iter_mut().enumerate() {
        let base = y * BYTES_PER_ROW;
        for n in 0..BYTES_PER_ROW {
            let byte = bytes.get(base + order[n]).copied().unwrap_or(0);
            *value |= u32::from(byte & 0x0F) << (n * 4);
        }
    }

    Bitmap::from_row_values(rows)
}

// ============================================================================
// Tests
// ============================================================================
