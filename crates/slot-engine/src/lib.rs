//! # slot-engine
//!
//! Deterministic availability resolution and booking admission for provider
//! schedules.
//!
//! Providers publish recurring weekly availability rules plus dated
//! exceptions; customers submit concrete time-window requests. The engine
//! expands rules and exceptions over a bounded horizon into disjoint open
//! intervals, tracks how many accepted bookings occupy any instant, and is
//! the single decision point for admitting, accepting, and declining booking
//! requests.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{NaiveTime, TimeZone, Utc, Weekday};
//! use slot_engine::{BookingEngine, RuleSpec, UserId};
//!
//! let engine = BookingEngine::new();
//! let provider = UserId(1);
//! let listing = engine.create_listing(provider, "Europe/Dublin", 1).unwrap();
//! engine
//!     .replace_rules(
//!         provider,
//!         listing,
//!         vec![RuleSpec {
//!             days: vec![Weekday::Mon],
//!             start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
//!             end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
//!             timezone: "Europe/Dublin".into(),
//!         }],
//!     )
//!     .unwrap();
//!
//! let open = engine
//!     .resolve_availability(
//!         listing,
//!         Utc.with_ymd_and_hms(2026, 1, 12, 0, 0, 0).unwrap(),
//!         Utc.with_ymd_and_hms(2026, 1, 13, 0, 0, 0).unwrap(),
//!     )
//!     .unwrap();
//! assert_eq!(open.len(), 1); // Monday 08:00-17:00 Dublin time
//! ```
//!
//! ## Modules
//!
//! - [`store`] — validated rule/exception/request storage
//! - [`resolver`] — rules + exceptions → disjoint, sorted open intervals
//! - [`ledger`] — per-listing reservation concurrency tracking
//! - [`evaluator`] — candidate-window decision pieces
//! - [`engine`] — the [`BookingEngine`] façade and its transactions
//! - [`dst`] — DST gap/fold handling for rule expansion
//! - [`error`] — error types
//! - [`types`] — ids, intervals, rules, exceptions, requests

pub mod dst;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod resolver;
pub mod store;
pub mod types;

pub use engine::BookingEngine;
pub use error::EngineError;
pub use evaluator::{Decision, RejectReason};
pub use ledger::CapacityLedger;
pub use resolver::{first_fit, resolve_open_intervals, MAX_HORIZON_DAYS};
pub use store::ScheduleStore;
pub use types::{
    AvailabilityException, AvailabilityRule, ExceptionId, ExceptionKind, Interval, Listing,
    ListingId, Request, RequestId, RequestStatus, RuleSpec, Service, ServiceId, ServiceTerms,
    UserId,
};
