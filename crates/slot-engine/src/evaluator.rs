//! Booking candidate evaluation — the pure decision pieces.
//!
//! The engine façade composes these with the resolver and the capacity
//! ledger; everything here is a bounded computation over plain values.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Interval, ServiceTerms};

/// Why a candidate window was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// The candidate is not fully contained in the resolved open set.
    NotInOpenWindow,
    /// The candidate starts inside the service's minimum-notice window.
    TooSoon,
    /// The candidate starts beyond the service's maximum-notice horizon.
    TooFar,
    /// Admitting the candidate would exceed the listing's capacity.
    CapacityExhausted,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            RejectReason::NotInOpenWindow => "NOT_IN_OPEN_WINDOW",
            RejectReason::TooSoon => "TOO_SOON",
            RejectReason::TooFar => "TOO_FAR",
            RejectReason::CapacityExhausted => "CAPACITY_EXHAUSTED",
        };
        f.write_str(code)
    }
}

/// Outcome of evaluating a candidate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub admit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl Decision {
    pub fn admitted() -> Self {
        Self {
            admit: true,
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            admit: false,
            reason: Some(reason),
        }
    }
}

/// Whether `window` is fully contained in the open union.
///
/// `open` must be disjoint and coalesced (resolver output): containment in
/// the union then means containment in a single interval. No partial credit —
/// a window that starts inside open time and runs past it is not covered.
pub fn covered_by(open: &[Interval], window: &Interval) -> bool {
    open.iter().any(|iv| iv.contains(window))
}

/// Notice-window gates: too soon inside `min_notice_min` of `now`, too far
/// beyond `max_notice_days`.
pub fn notice_violation(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    terms: &ServiceTerms,
) -> Option<RejectReason> {
    if start < now + Duration::minutes(i64::from(terms.min_notice_min)) {
        return Some(RejectReason::TooSoon);
    }
    if start > now + Duration::days(i64::from(terms.max_notice_days)) {
        return Some(RejectReason::TooFar);
    }
    None
}

/// Expand a window by the service buffers into the interval actually held
/// against capacity.
pub fn effective_interval(window: &Interval, terms: &ServiceTerms) -> Interval {
    Interval::new(
        window.start - Duration::minutes(i64::from(terms.buffer_before_min)),
        window.end + Duration::minutes(i64::from(terms.buffer_after_min)),
    )
}
