//! Physical memory manager
//!
//! A best-fit free-list allocator over one contiguous address space.
//!
//! ## Invariants
//!
//! - Free ranges are pairwise disjoint and never adjacent; a range that is
//!   released is merged with any neighbour it touches before it rejoins the
//!   free list.
//! - Free ranges and reservations together cover the whole address space
//!   exactly once.
//! - A failed operation leaves both collections untouched.
//!
//! Addresses are translated, not paged: a process sees logical addresses
//! starting at `logical_base`, which map linearly onto its one reserved range.

use core_types::{AddressRange, Pid};
use kernel_api::MemoryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Memory manager audit events (test-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryEvent {
    /// A range was carved out for a process
    Reserved { pid: Pid, range: AddressRange },
    /// A reservation was released; `merged` is the free range it became part of
    Freed {
        pid: Pid,
        range: AddressRange,
        merged: AddressRange,
    },
    /// No free range was large enough
    ReservationFailed {
        pid: Pid,
        requested: u64,
        largest_free: u64,
    },
}

/// Best-fit allocator with coalescing
#[derive(Debug, Clone)]
pub struct MemoryManager {
    total_size: u64,
    logical_base: u64,
    /// Free ranges keyed by start address, value is the end address
    available: BTreeMap<u64, u64>,
    reserved: HashMap<Pid, AddressRange>,
    audit_log: Vec<MemoryEvent>,
}

impl MemoryManager {
    /// Creates a manager with the whole address space free
    pub fn new(total_size: u64, logical_base: u64) -> Self {
        let mut available = BTreeMap::new();
        if total_size > 0 {
            available.insert(0, total_size);
        }
        Self {
            total_size,
            logical_base,
            available,
            reserved: HashMap::new(),
            audit_log: Vec::new(),
        }
    }

    /// Creates a manager and reserves the low `kernel_reserved` bytes for
    /// [`Pid::KERNEL`]
    pub fn with_kernel_block(
        total_size: u64,
        kernel_reserved: u64,
        logical_base: u64,
    ) -> Result<Self, MemoryError> {
        if kernel_reserved >= total_size {
            return Err(MemoryError::InvalidLayout {
                total: total_size,
                reserved: kernel_reserved,
            });
        }
        let mut manager = Self::new(total_size, logical_base);
        if kernel_reserved > 0 {
            manager.reserve(kernel_reserved, Pid::KERNEL)?;
        }
        Ok(manager)
    }

    /// Reserves `size` bytes for `pid`
    ///
    /// Candidates are scanned in ascending `(length, start)` order and the
    /// first one that fits wins, so the smallest sufficient range is used and
    /// equal-sized ranges prefer the lower address. The low `size` bytes are
    /// taken and the remainder stays free.
    pub fn reserve(&mut self, size: u64, pid: Pid) -> Result<AddressRange, MemoryError> {
        if size == 0 {
            return Err(MemoryError::ZeroSized);
        }
        if self.reserved.contains_key(&pid) {
            return Err(MemoryError::AlreadyReserved(pid));
        }

        let best_fit = self
            .available
            .iter()
            .map(|(&start, &end)| AddressRange::new(start, end))
            .filter(|range| range.len() >= size)
            .min_by_key(|range| (range.len(), range.start));

        let Some(candidate) = best_fit else {
            let largest_free = self.largest_free();
            warn!(%pid, requested = size, largest_free, "memory reservation failed");
            self.audit_log.push(MemoryEvent::ReservationFailed {
                pid,
                requested: size,
                largest_free,
            });
            return Err(MemoryError::Exhausted {
                requested: size,
                largest_free,
            });
        };

        self.available.remove(&candidate.start);
        let taken = AddressRange::with_len(candidate.start, size);
        if taken.end < candidate.end {
            self.available.insert(taken.end, candidate.end);
        }
        self.reserved.insert(pid, taken);

        debug!(%pid, range = %taken, "memory reserved");
        self.audit_log.push(MemoryEvent::Reserved { pid, range: taken });
        Ok(taken)
    }

    /// Releases the reservation held by `pid`
    ///
    /// The released range absorbs a free neighbour ending exactly at its start
    /// and one starting exactly at its end. Returns the released range.
    pub fn free(&mut self, pid: Pid) -> Result<AddressRange, MemoryError> {
        let range = self
            .reserved
            .remove(&pid)
            .ok_or(MemoryError::NotReserved(pid))?;

        let mut start = range.start;
        let mut end = range.end;

        let before = self
            .available
            .range(..start)
            .next_back()
            .map(|(&s, &e)| (s, e));
        if let Some((before_start, before_end)) = before {
            if before_end == start {
                self.available.remove(&before_start);
                start = before_start;
            }
        }
        if let Some(after_end) = self.available.remove(&end) {
            end = after_end;
        }
        self.available.insert(start, end);

        let merged = AddressRange::new(start, end);
        debug!(%pid, range = %range, merged = %merged, "memory freed");
        self.audit_log.push(MemoryEvent::Freed { pid, range, merged });
        Ok(range)
    }

    /// Maps a logical address of `pid` to a physical address
    ///
    /// Returns `None` when `pid` holds no reservation or the address falls
    /// outside it.
    pub fn translate(&self, logical_address: u64, pid: Pid) -> Option<u64> {
        let range = self.reserved.get(&pid)?;
        let offset = logical_address.checked_sub(self.logical_base)?;
        let physical = range.start.checked_add(offset)?;
        range.contains(physical).then_some(physical)
    }

    /// Returns the range reserved for `pid`
    pub fn reservation(&self, pid: Pid) -> Option<AddressRange> {
        self.reserved.get(&pid).copied()
    }

    pub fn is_reserved(&self, pid: Pid) -> bool {
        self.reserved.contains_key(&pid)
    }

    /// Returns the free ranges in address order
    pub fn available_ranges(&self) -> Vec<AddressRange> {
        self.available
            .iter()
            .map(|(&start, &end)| AddressRange::new(start, end))
            .collect()
    }

    /// Returns the free ranges in best-fit scan order
    pub fn free_list(&self) -> Vec<AddressRange> {
        let mut ranges = self.available_ranges();
        ranges.sort_by_key(|range| (range.len(), range.start));
        ranges
    }

    /// Returns every reservation in address order, kernel block included
    pub fn reservations(&self) -> Vec<(Pid, AddressRange)> {
        let mut reservations: Vec<(Pid, AddressRange)> =
            self.reserved.iter().map(|(&pid, &range)| (pid, range)).collect();
        reservations.sort_by_key(|(_, range)| range.start);
        reservations
    }

    /// Length of the largest free range
    pub fn largest_free(&self) -> u64 {
        self.available
            .iter()
            .map(|(&start, &end)| end - start)
            .max()
            .unwrap_or(0)
    }

    /// Total free bytes across all ranges
    pub fn free_bytes(&self) -> u64 {
        self.available.iter().map(|(&start, &end)| end - start).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn logical_base(&self) -> u64 {
        self.logical_base
    }

    /// Verifies the free-list and partition invariants
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut pieces: Vec<(AddressRange, bool)> = self
            .available
            .iter()
            .map(|(&start, &end)| (AddressRange::new(start, end), true))
            .chain(self.reserved.values().map(|&range| (range, false)))
            .collect();
        pieces.sort_by_key(|(range, _)| range.start);

        let mut cursor = 0;
        let mut previous: Option<(AddressRange, bool)> = None;
        for (range, is_free) in pieces {
            if range.is_empty() {
                return Err(format!("empty range {}", range));
            }
            if let Some((prev, prev_free)) = previous {
                if prev.overlaps(&range) {
                    return Err(format!("range {} overlaps {}", range, prev));
                }
                if is_free && prev_free && prev.is_adjacent(&range) {
                    return Err(format!("free range {} is adjacent to free range {}", range, prev));
                }
            }
            if range.start != cursor {
                return Err(format!("gap before range {}: expected start {:#x}", range, cursor));
            }
            cursor = range.end;
            previous = Some((range, is_free));
        }

        if cursor != self.total_size {
            return Err(format!(
                "ranges end at {:#x}, address space ends at {:#x}",
                cursor, self.total_size
            ));
        }
        Ok(())
    }

    /// Returns the audit log (test-only)
    pub fn audit_log(&self) -> &[MemoryEvent] {
        &self.audit_log
    }

    /// Clears the audit log (test-only)
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }
}
