//! Tests for the `BookingEngine` façade: admission scenarios, the atomic
//! accept transaction, the request state machine, and store validation.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use slot_engine::{
    BookingEngine, EngineError, ExceptionKind, Interval, ListingId, RejectReason, RequestStatus,
    RuleSpec, ServiceTerms, UserId,
};

const PROVIDER: UserId = UserId(1);
const CUSTOMER: UserId = UserId(7);
const INTRUDER: UserId = UserId(9);

// ── Helpers ─────────────────────────────────────────────────────────────────

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn iv(start: &str, end: &str) -> Interval {
    Interval::new(utc(start), utc(end))
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn monday_rule() -> RuleSpec {
    RuleSpec {
        days: vec![Weekday::Mon],
        start: time(8, 0),
        end: time(17, 0),
        timezone: "Europe/Dublin".into(),
    }
}

/// Engine with one Dublin listing open Mondays 08:00-17:00.
fn dublin_engine(capacity: u32) -> (BookingEngine, ListingId) {
    let engine = BookingEngine::new();
    let listing = engine
        .create_listing(PROVIDER, "Europe/Dublin", capacity)
        .unwrap();
    engine
        .replace_rules(PROVIDER, listing, vec![monday_rule()])
        .unwrap();
    (engine, listing)
}

fn terms(min_notice_min: u32, max_notice_days: u32) -> ServiceTerms {
    ServiceTerms {
        duration_min: 60,
        buffer_before_min: 0,
        buffer_after_min: 0,
        min_notice_min,
        max_notice_days,
    }
}

// 2026-01-12 is a Monday; Dublin is UTC+0 in January.
const MONDAY_9: &str = "2026-01-12T09:00:00Z";
const MONDAY_10: &str = "2026-01-12T10:00:00Z";
const WEEK_BEFORE: &str = "2026-01-05T08:00:00Z";

// ── Candidate evaluation ────────────────────────────────────────────────────

#[test]
fn candidate_inside_open_window_is_admitted() {
    let (engine, listing) = dublin_engine(1);

    let decision = engine
        .evaluate_candidate_at(listing, None, utc(MONDAY_9), utc(MONDAY_10), utc(WEEK_BEFORE))
        .unwrap();

    assert!(decision.admit);
    assert_eq!(decision.reason, None);
}

#[test]
fn partial_overlap_is_rejected() {
    // Open Mondays 09:00-10:30 only; a 09:00-11:00 candidate runs past the
    // open window and gets no partial credit.
    let engine = BookingEngine::new();
    let listing = engine.create_listing(PROVIDER, "Europe/Dublin", 1).unwrap();
    engine
        .replace_rules(
            PROVIDER,
            listing,
            vec![RuleSpec {
                days: vec![Weekday::Mon],
                start: time(9, 0),
                end: time(10, 30),
                timezone: "Europe/Dublin".into(),
            }],
        )
        .unwrap();

    let decision = engine
        .evaluate_candidate_at(
            listing,
            None,
            utc(MONDAY_9),
            utc("2026-01-12T11:00:00Z"),
            utc(WEEK_BEFORE),
        )
        .unwrap();

    assert!(!decision.admit);
    assert_eq!(decision.reason, Some(RejectReason::NotInOpenWindow));
}

#[test]
fn minimum_notice_rejects_too_soon() {
    // 24h minimum notice, candidate starting two hours from now.
    let (engine, listing) = dublin_engine(1);
    let service = engine
        .add_service(PROVIDER, listing, terms(1440, 60))
        .unwrap();

    let now = utc("2026-01-12T08:00:00Z");
    let decision = engine
        .evaluate_candidate_at(listing, Some(service), utc(MONDAY_9), utc(MONDAY_10), now)
        .unwrap();

    assert!(!decision.admit);
    assert_eq!(decision.reason, Some(RejectReason::TooSoon));
}

#[test]
fn maximum_notice_rejects_too_far() {
    // 7-day maximum notice, candidate four weeks out (2026-02-09 is a Monday).
    let (engine, listing) = dublin_engine(1);
    let service = engine.add_service(PROVIDER, listing, terms(0, 7)).unwrap();

    let decision = engine
        .evaluate_candidate_at(
            listing,
            Some(service),
            utc("2026-02-09T09:00:00Z"),
            utc("2026-02-09T10:00:00Z"),
            utc("2026-01-12T08:00:00Z"),
        )
        .unwrap();

    assert!(!decision.admit);
    assert_eq!(decision.reason, Some(RejectReason::TooFar));
}

#[test]
fn exhausted_capacity_rejects_candidate() {
    let (engine, listing) = dublin_engine(1);
    let request = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.accept_request(PROVIDER, request).unwrap();

    let decision = engine
        .evaluate_candidate_at(listing, None, utc(MONDAY_9), utc(MONDAY_10), utc(WEEK_BEFORE))
        .unwrap();

    assert!(!decision.admit);
    assert_eq!(decision.reason, Some(RejectReason::CapacityExhausted));
}

#[test]
fn buffers_extend_the_reserved_interval() {
    let (engine, listing) = dublin_engine(1);
    let service = engine
        .add_service(
            PROVIDER,
            listing,
            ServiceTerms {
                duration_min: 60,
                buffer_before_min: 0,
                buffer_after_min: 60,
                min_notice_min: 0,
                max_notice_days: 366,
            },
        )
        .unwrap();
    let request = engine
        .create_request(
            CUSTOMER,
            listing,
            Some(service),
            vec![iv(MONDAY_9, MONDAY_10)],
        )
        .unwrap();
    engine.accept_request(PROVIDER, request).unwrap();

    // 10:15-10:45 sits inside the accepted booking's trailing buffer.
    let blocked = engine
        .evaluate_candidate_at(
            listing,
            Some(service),
            utc("2026-01-12T10:15:00Z"),
            utc("2026-01-12T10:45:00Z"),
            utc(WEEK_BEFORE),
        )
        .unwrap();
    assert_eq!(blocked.reason, Some(RejectReason::CapacityExhausted));

    // 11:00 is past the buffer; half-open intervals touching do not overlap.
    let clear = engine
        .evaluate_candidate_at(
            listing,
            Some(service),
            utc("2026-01-12T11:00:00Z"),
            utc("2026-01-12T12:00:00Z"),
            utc(WEEK_BEFORE),
        )
        .unwrap();
    assert!(clear.admit);
}

#[test]
fn reversed_candidate_window_is_invalid() {
    let (engine, listing) = dublin_engine(1);
    let err = engine
        .evaluate_candidate_at(listing, None, utc(MONDAY_10), utc(MONDAY_9), utc(WEEK_BEFORE))
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn evaluating_unknown_listing_is_not_found() {
    let engine = BookingEngine::new();
    let err = engine
        .evaluate_candidate_at(
            ListingId(42),
            None,
            utc(MONDAY_9),
            utc(MONDAY_10),
            utc(WEEK_BEFORE),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[test]
fn service_of_another_listing_is_rejected() {
    let (engine, listing) = dublin_engine(1);
    let other = engine.create_listing(PROVIDER, "Europe/Dublin", 1).unwrap();
    let foreign_service = engine.add_service(PROVIDER, other, terms(0, 366)).unwrap();

    let err = engine
        .evaluate_candidate_at(
            listing,
            Some(foreign_service),
            utc(MONDAY_9),
            utc(MONDAY_10),
            utc(WEEK_BEFORE),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// ── Accept / decline ────────────────────────────────────────────────────────

#[test]
fn racing_accepts_conflict_on_last_slot() {
    // Capacity 1, two pending requests for the same Monday 09:00-10:00.
    let (engine, listing) = dublin_engine(1);
    let first = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    let second = engine
        .create_request(UserId(8), listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();

    let accepted = engine.accept_request(PROVIDER, first).unwrap();
    assert_eq!(accepted, iv(MONDAY_9, MONDAY_10));

    let err = engine.accept_request(PROVIDER, second).unwrap_err();
    assert!(matches!(err, EngineError::SlotConflict));

    // The loser stays pending so the provider can offer an alternative.
    assert_eq!(
        engine.request(second).unwrap().status,
        RequestStatus::Pending
    );
    assert_eq!(
        engine.request(first).unwrap().status,
        RequestStatus::Accepted
    );
}

#[test]
fn accept_falls_back_to_a_later_candidate_window() {
    let (engine, listing) = dublin_engine(1);
    let first = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.accept_request(PROVIDER, first).unwrap();

    let second = engine
        .create_request(
            UserId(8),
            listing,
            None,
            vec![
                iv(MONDAY_9, MONDAY_10),
                iv("2026-01-12T13:00:00Z", "2026-01-12T14:00:00Z"),
            ],
        )
        .unwrap();

    let accepted = engine.accept_request(PROVIDER, second).unwrap();
    assert_eq!(accepted, iv("2026-01-12T13:00:00Z", "2026-01-12T14:00:00Z"));

    let request = engine.request(second).unwrap();
    assert_eq!(request.status, RequestStatus::Accepted);
    assert_eq!(request.accepted_window, Some(accepted));
}

#[test]
fn capacity_invariant_holds_across_a_sequence() {
    let (engine, listing) = dublin_engine(2);
    let window = iv(MONDAY_9, MONDAY_10);
    let requests: Vec<_> = (0..3)
        .map(|i| {
            engine
                .create_request(UserId(20 + i), listing, None, vec![window])
                .unwrap()
        })
        .collect();

    engine.accept_request(PROVIDER, requests[0]).unwrap();
    engine.accept_request(PROVIDER, requests[1]).unwrap();
    let err = engine.accept_request(PROVIDER, requests[2]).unwrap_err();
    assert!(matches!(err, EngineError::SlotConflict));

    // Never more than `capacity` simultaneous reservations.
    assert_eq!(
        engine
            .max_overlap(listing, utc(MONDAY_9), utc(MONDAY_10))
            .unwrap(),
        2
    );
}

#[test]
fn accepting_a_decided_request_errors() {
    let (engine, listing) = dublin_engine(2);
    let request = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.accept_request(PROVIDER, request).unwrap();

    let err = engine.accept_request(PROVIDER, request).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyDecided(_)));
}

#[test]
fn declining_a_decided_request_errors() {
    let (engine, listing) = dublin_engine(1);
    let request = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.accept_request(PROVIDER, request).unwrap();

    let err = engine.decline_request(PROVIDER, request).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyDecided(_)));
}

#[test]
fn decline_leaves_capacity_untouched() {
    let (engine, listing) = dublin_engine(1);
    let declined = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.decline_request(PROVIDER, declined).unwrap();
    assert_eq!(
        engine.request(declined).unwrap().status,
        RequestStatus::Declined
    );

    // The slot is still free for someone else.
    let other = engine
        .create_request(UserId(8), listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    engine.accept_request(PROVIDER, other).unwrap();
}

// ── Ownership ───────────────────────────────────────────────────────────────

#[test]
fn ownership_errors_are_distinct_from_not_found() {
    let (engine, listing) = dublin_engine(1);

    let err = engine
        .replace_rules(INTRUDER, listing, vec![monday_rule()])
        .unwrap_err();
    assert!(matches!(err, EngineError::Ownership(_)), "got: {err}");

    let err = engine
        .add_exception(
            INTRUDER,
            listing,
            utc(MONDAY_9),
            utc(MONDAY_10),
            ExceptionKind::Block,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Ownership(_)), "got: {err}");

    let request = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();
    let err = engine.accept_request(INTRUDER, request).unwrap_err();
    assert!(matches!(err, EngineError::Ownership(_)), "got: {err}");
    let err = engine.decline_request(INTRUDER, request).unwrap_err();
    assert!(matches!(err, EngineError::Ownership(_)), "got: {err}");
}

// ── Store validation ────────────────────────────────────────────────────────

#[test]
fn listing_validation() {
    let engine = BookingEngine::new();

    let err = engine
        .create_listing(PROVIDER, "Europe/Dublin", 0)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.create_listing(PROVIDER, "Mars/Olympus", 1).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimezone(_)));
}

#[test]
fn rule_validation_rejects_malformed_rules() {
    let (engine, listing) = dublin_engine(1);

    let empty_days = RuleSpec {
        days: vec![],
        start: time(8, 0),
        end: time(17, 0),
        timezone: "Europe/Dublin".into(),
    };
    let err = engine
        .replace_rules(PROVIDER, listing, vec![empty_days])
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let reversed = RuleSpec {
        days: vec![Weekday::Mon],
        start: time(17, 0),
        end: time(8, 0),
        timezone: "Europe/Dublin".into(),
    };
    let err = engine
        .replace_rules(PROVIDER, listing, vec![reversed])
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let bad_zone = RuleSpec {
        days: vec![Weekday::Mon],
        start: time(8, 0),
        end: time(17, 0),
        timezone: "Mars/Olympus".into(),
    };
    let err = engine
        .replace_rules(PROVIDER, listing, vec![bad_zone])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimezone(_)));
}

#[test]
fn failed_replace_keeps_the_old_rule_set() {
    // Replacement is atomic: one bad rule rejects the whole set and the
    // previous rules stay in force.
    let (engine, listing) = dublin_engine(1);

    let tuesday = RuleSpec {
        days: vec![Weekday::Tue],
        start: time(9, 0),
        end: time(12, 0),
        timezone: "Europe/Dublin".into(),
    };
    let reversed = RuleSpec {
        days: vec![Weekday::Wed],
        start: time(12, 0),
        end: time(9, 0),
        timezone: "Europe/Dublin".into(),
    };
    engine
        .replace_rules(PROVIDER, listing, vec![tuesday, reversed])
        .unwrap_err();

    // Monday still resolves, Tuesday still does not.
    let monday = engine
        .resolve_availability(
            listing,
            utc("2026-01-12T00:00:00Z"),
            utc("2026-01-13T00:00:00Z"),
        )
        .unwrap();
    assert_eq!(monday.len(), 1);

    let tuesday = engine
        .resolve_availability(
            listing,
            utc("2026-01-13T00:00:00Z"),
            utc("2026-01-14T00:00:00Z"),
        )
        .unwrap();
    assert!(tuesday.is_empty());
}

#[test]
fn exception_lifecycle() {
    let (engine, listing) = dublin_engine(1);

    let err = engine
        .add_exception(
            PROVIDER,
            listing,
            utc(MONDAY_10),
            utc(MONDAY_9),
            ExceptionKind::Block,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let exception = engine
        .add_exception(
            PROVIDER,
            listing,
            utc("2026-01-12T12:00:00Z"),
            utc("2026-01-12T13:00:00Z"),
            ExceptionKind::Block,
            Some("lunch".into()),
        )
        .unwrap();
    let split = engine
        .resolve_availability(
            listing,
            utc("2026-01-12T00:00:00Z"),
            utc("2026-01-13T00:00:00Z"),
        )
        .unwrap();
    assert_eq!(split.len(), 2);

    engine.remove_exception(PROVIDER, exception).unwrap();
    let whole = engine
        .resolve_availability(
            listing,
            utc("2026-01-12T00:00:00Z"),
            utc("2026-01-13T00:00:00Z"),
        )
        .unwrap();
    assert_eq!(whole.len(), 1);

    // Removing again reports not-found rather than silently succeeding.
    let err = engine.remove_exception(PROVIDER, exception).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[test]
fn request_validation() {
    let (engine, listing) = dublin_engine(1);

    let err = engine
        .create_request(CUSTOMER, listing, None, vec![])
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let four = vec![iv(MONDAY_9, MONDAY_10); 4];
    let err = engine
        .create_request(CUSTOMER, listing, None, four)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_10, MONDAY_9)])
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// ── Supplementary queries ───────────────────────────────────────────────────

#[test]
fn first_bookable_slot_skips_too_short_openings() {
    let (engine, listing) = dublin_engine(1);
    // Leave only 30 free minutes on Jan 12; the next Monday is wide open.
    engine
        .add_exception(
            PROVIDER,
            listing,
            utc("2026-01-12T08:00:00Z"),
            utc("2026-01-12T16:30:00Z"),
            ExceptionKind::Block,
            None,
        )
        .unwrap();

    let slot = engine
        .first_bookable_slot(
            listing,
            60,
            utc("2026-01-12T00:00:00Z"),
            utc("2026-01-26T00:00:00Z"),
        )
        .unwrap();

    assert_eq!(slot, Some(iv("2026-01-19T08:00:00Z", "2026-01-19T17:00:00Z")));
}

#[test]
fn removing_a_listing_cascades() {
    let (engine, listing) = dublin_engine(1);
    let request = engine
        .create_request(CUSTOMER, listing, None, vec![iv(MONDAY_9, MONDAY_10)])
        .unwrap();

    engine.remove_listing(PROVIDER, listing).unwrap();

    assert!(matches!(
        engine
            .resolve_availability(listing, utc(MONDAY_9), utc(MONDAY_10))
            .unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        engine.request(request).unwrap_err(),
        EngineError::NotFound(_)
    ));
}
