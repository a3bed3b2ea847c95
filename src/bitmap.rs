// src/bitmap.rs
//
// The 16x32 monochrome pixel grid that every encoding is derived from.
// Each row is stored as its little-endian 32-bit value: column x is bit x.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROWS: usize = 16;
pub const COLS: usize = 32;

// ============================================================================
// Bitmap
// ============================================================================

/// 16 rows x 32 columns of on/off pixels. Row 0 is the top, column 0 the left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bitmap {
    rows: [u32; ROWS],
}

impl Bitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_row_values(rows: [u32; ROWS]) -> Self {
        Self { rows }
    }

    /// Build from a row-major predicate, handy for tests and pattern fills.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bitmap = Self::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                if f(row, col) {
                    bitmap.rows[row] |= 1 << col;
                }
            }
        }
        bitmap
    }

    pub fn rows(&self) -> &[u32; ROWS] {
        &self.rows
    }

    /// Row value with column x at bit x. Out-of-range rows read as blank.
    pub fn row_value(&self, row: usize) -> u32 {
        self.rows.get(row).copied().unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        col < COLS && (self.row_value(row) >> col) & 1 == 1
    }

    /// Set a single pixel. Returns false (and does nothing) when out of range.
    pub fn paint(&mut self, row: usize, col: usize, on: bool) -> bool {
        if row >= ROWS || col >= COLS {
            return false;
        }
        if on {
            self.rows[row] |= 1 << col;
        } else {
            self.rows[row] &= !(1 << col);
        }
        true
    }

    /// Flip a pixel and return its new value.
    pub fn toggle(&mut self, row: usize, col: usize) -> Option<bool> {
        if row >= ROWS || col >= COLS {
            return None;
        }
        self.rows[row] ^= 1 << col;
        Some(self.get(row, col))
    }

    pub fn clear(&mut self) {
        self.rows = [0; ROWS];
    }

    /// Replace the whole frame. Decoded frames are only ever applied this way,
    /// so a live buffer is never left half-updated.
    pub fn replace_with(&mut self, other: &Bitmap) {
        self.rows = other.rows;
    }

    pub fn lit_count(&self) -> u32 {
        self.rows.iter().map(|r| r.count_ones()).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &value) in self.rows.iter().enumerate() {
            for col in 0..COLS {
                let c = if (value >> col) & 1 == 1 { '#' } else { '.' };
                write!(f, "{}", c)?;
            }
            if i + 1 < ROWS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_maps_column_to_bit() {
        let mut bitmap = Bitmap::new();
        assert!(bitmap.paint(3, 0, true));
        assert!(bitmap.paint(3, 31, true));
        assert_eq!(bitmap.row_value(3), 0x8000_0001);
        assert!(bitmap.get(3, 31));
        assert!(!bitmap.get(3, 30));
    }

    #[test]
    fn test_paint_out_of_range_is_ignored() {
        let mut bitmap = Bitmap::new();
        assert!(!bitmap.paint(16, 0, true));
        assert!(!bitmap.paint(0, 32, true));
        assert!(bitmap.is_blank());
        assert!(!bitmap.get(99, 99));
    }

    #[test]
    fn test_toggle_and_clear() {
        let mut bitmap = Bitmap::new();
        assert_eq!(bitmap.toggle(5, 7), Some(true));
        assert_eq!(bitmap.lit_count(), 1);
        assert_eq!(bitmap.toggle(5, 7), Some(false));
        assert_eq!(bitmap.toggle(16, 0), None);

        bitmap.paint(0, 0, true);
        bitmap.paint(15, 31, true);
        bitmap.clear();
        assert!(bitmap.is_blank());
    }

    #[test]
    fn test_replace_with_copies_every_row() {
        let source = Bitmap::from_fn(|r, c| (r + c) % 3 == 0);
        let mut target = Bitmap::from_fn(|_, _| true);
        target.replace_with(&source);
        assert_eq!(target, source);
    }

    #[test]
    fn test_display_preview() {
        let mut bitmap = Bitmap::new();
        bitmap.paint(0, 1, true);
        let text = bitmap.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), ROWS);
        assert!(lines[0].starts_with(".#.."));
        assert!(lines.iter().all(|l| l.len() == COLS));
    }
}
