//! Core data types shared across the engine.
//!
//! All persisted instants are UTC; local wall-clock times appear only inside
//! availability rules, paired with the IANA zone that interprets them.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// A provider or customer account, as known to the surrounding platform.
    UserId
);
id_newtype!(
    /// A provider's published profile.
    ListingId
);
id_newtype!(
    /// A bookable service offered under a listing.
    ServiceId
);
id_newtype!(
    /// A dated availability exception.
    ExceptionId
);
id_newtype!(
    /// A customer's booking request.
    RequestId
);

/// A half-open UTC interval `[start, end)`.
///
/// The one interval type used for exceptions, request windows, resolved open
/// time, and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Two half-open intervals overlap iff each starts before the other ends.
    /// Touching at a boundary instant is not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The overlapping portion of two intervals, if any.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Interval { start, end })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A recurring weekly availability pattern, validated by the store.
///
/// `days` is deduplicated and held in Monday-first order so identical rule
/// sets compare equal regardless of input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tz: Tz,
}

impl AvailabilityRule {
    pub fn applies_on(&self, weekday: Weekday) -> bool {
        self.days.contains(&weekday)
    }
}

/// Raw rule input as submitted by a provider, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// IANA zone name, e.g. `"Europe/Dublin"`.
    pub timezone: String,
}

/// Whether an exception removes or adds availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionKind {
    /// Hard unavailability (e.g. a holiday). Always wins over open time.
    Block,
    /// A one-off opening on top of the weekly rules.
    Open,
}

/// A dated override on a listing's recurring schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub id: ExceptionId,
    pub window: Interval,
    pub kind: ExceptionKind,
    pub reason: Option<String>,
}

/// A provider's published profile, as far as scheduling is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub timezone: Tz,
    /// Maximum number of simultaneous accepted bookings.
    pub capacity: u32,
}

/// Scheduling terms of a service: how long a booking runs, the buffers it
/// reserves around itself, and how soon/far out it may be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTerms {
    pub duration_min: u32,
    pub buffer_before_min: u32,
    pub buffer_after_min: u32,
    pub min_notice_min: u32,
    pub max_notice_days: u32,
}

impl ServiceTerms {
    /// Terms applied when a request names no service: no buffers, no notice
    /// floor, and the horizon cap as the notice ceiling.
    pub const UNRESTRICTED: ServiceTerms = ServiceTerms {
        duration_min: 0,
        buffer_before_min: 0,
        buffer_after_min: 0,
        min_notice_min: 0,
        max_notice_days: crate::resolver::MAX_HORIZON_DAYS as u32,
    };
}

/// A bookable service offered under a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub listing_id: ListingId,
    pub terms: ServiceTerms,
}

/// Lifecycle of a booking request. `Accepted` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

/// A customer's booking ask against a listing: up to three candidate windows,
/// decided at most once by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub listing_id: ListingId,
    pub service_id: Option<ServiceId>,
    pub customer: UserId,
    pub windows: Vec<Interval>,
    pub status: RequestStatus,
    /// The candidate window the provider accepted, once status is `Accepted`.
    pub accepted_window: Option<Interval>,
    /// The buffer-expanded interval held in the capacity ledger.
    pub reserved: Option<Interval>,
}
