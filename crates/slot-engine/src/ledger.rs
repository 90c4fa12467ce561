//! Capacity ledger — how many accepted bookings occupy any instant in time.
//!
//! Capacity is a concurrency bound, not a total: what matters is the maximum
//! number of reservations alive at the same instant, computed with a boundary
//! sweep over the reservations that intersect the probe interval.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{EngineError, Result};
use crate::types::{Interval, ListingId};

/// Per-listing multiset of reserved effective intervals.
#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    /// Reservations per listing, kept sorted by `(start, end)`.
    reservations: HashMap<ListingId, Vec<Interval>>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reservation. Insertion keeps the per-listing list sorted, so
    /// later sweeps touch only the intersecting range — no rescan of history.
    pub fn reserve(&mut self, listing_id: ListingId, interval: Interval) {
        let list = self.reservations.entry(listing_id).or_default();
        let at = list.partition_point(|r| (r.start, r.end) <= (interval.start, interval.end));
        list.insert(at, interval);
    }

    /// Release one previously recorded reservation.
    ///
    /// A reservation that was never recorded (or was already released) is a
    /// `NotFound` error, so occupancy can never go negative.
    pub fn release(&mut self, listing_id: ListingId, interval: Interval) -> Result<()> {
        if let Some(list) = self.reservations.get_mut(&listing_id) {
            if let Some(at) = list.iter().position(|r| *r == interval) {
                list.remove(at);
                return Ok(());
            }
        }
        Err(EngineError::NotFound(format!(
            "reservation [{}, {}) on listing {listing_id}",
            interval.start, interval.end
        )))
    }

    /// Maximum number of simultaneous reservations at any instant within
    /// `interval`.
    ///
    /// Half-open semantics: a reservation ending at T does not overlap one
    /// starting at T.
    pub fn max_overlap(&self, listing_id: ListingId, interval: &Interval) -> u32 {
        let Some(list) = self.reservations.get(&listing_id) else {
            return 0;
        };

        let mut bounds: Vec<(DateTime<Utc>, i32)> = Vec::new();
        for r in list {
            if r.start >= interval.end {
                // Sorted by start — nothing further can intersect.
                break;
            }
            if let Some(hit) = r.intersect(interval) {
                bounds.push((hit.start, 1));
                bounds.push((hit.end, -1));
            }
        }
        // Ends sort before starts at the same instant, so touching
        // reservations never count as concurrent.
        bounds.sort_by_key(|&(t, delta)| (t, delta));

        let mut current = 0i32;
        let mut max = 0i32;
        for (_, delta) in bounds {
            current += delta;
            max = max.max(current);
        }
        max.max(0) as u32
    }

    /// Snapshot of a listing's reservations, sorted by `(start, end)`.
    pub fn reservations(&self, listing_id: ListingId) -> &[Interval] {
        self.reservations
            .get(&listing_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop all reservations for a listing (cascade on listing removal).
    pub fn clear_listing(&mut self, listing_id: ListingId) {
        self.reservations.remove(&listing_id);
    }
}
