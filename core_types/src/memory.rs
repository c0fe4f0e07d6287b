//! Physical address ranges
//!
//! The simulated machine has one flat physical address space measured in
//! bytes. Ranges are half-open: `start` is included, `end` is not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One kibibyte
pub const KIB: u64 = 1024;

/// One mebibyte
pub const MIB: u64 = 1024 * KIB;

/// Half-open range `[start, end)` of physical addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    /// Creates a range; `end` is clamped so the range is never inverted
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Creates a range of `len` bytes beginning at `start`
    pub fn with_len(start: u64, len: u64) -> Self {
        Self::new(start, start.saturating_add(len))
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }

    /// Returns true if the two ranges share at least one address
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if one range ends exactly where the other begins
    pub fn is_adjacent(&self, other: &AddressRange) -> bool {
        self.end == other.start || other.end == self.start
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Parses a byte count such as `4096`, `64KiB` or `2MiB`
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, scale) = if let Some(n) = text.strip_suffix("MiB") {
        (n, MIB)
    } else if let Some(n) = text.strip_suffix("KiB") {
        (n, KIB)
    } else if let Some(n) = text.strip_suffix('B') {
        (n, 1)
    } else {
        (text, 1)
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len_and_contains() {
        let range = AddressRange::with_len(100, 50);
        assert_eq!(range.len(), 50);
        assert!(range.contains(100));
        assert!(range.contains(149));
        assert!(!range.contains(150));
    }

    #[test]
    fn test_inverted_range_is_clamped_empty() {
        let range = AddressRange::new(10, 5);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let low = AddressRange::new(0, 10);
        let high = AddressRange::new(10, 20);
        assert!(low.is_adjacent(&high));
        assert!(high.is_adjacent(&low));
        assert!(!low.overlaps(&high));
    }

    #[test]
    fn test_overlapping_ranges() {
        let a = AddressRange::new(0, 10);
        let b = AddressRange::new(5, 15);
        assert!(a.overlaps(&b));
        assert!(!a.is_adjacent(&b));
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("64KiB"), Some(64 * KIB));
        assert_eq!(parse_size("2MiB"), Some(2 * MIB));
        assert_eq!(parse_size("12B"), Some(12));
        assert_eq!(parse_size("lots"), None);
    }
}
