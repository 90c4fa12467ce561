//! Calendar resolution — expands weekly rules plus dated exceptions over a
//! bounded horizon into the maximal set of disjoint open intervals.
//!
//! Resolution is deterministic and idempotent: identical rule/exception state
//! yields identical output regardless of insertion order. Wall-clock rule
//! times are preserved across DST transitions, so the UTC duration of an
//! occurrence may differ by an hour on transition days.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::dst::{local_to_utc, GapPolicy};
use crate::types::{AvailabilityException, AvailabilityRule, ExceptionKind, Interval};

/// Hard cap on the resolution horizon, in days. A `to` bound further out than
/// `from + MAX_HORIZON_DAYS` is clamped, bounding computation.
pub const MAX_HORIZON_DAYS: i64 = 366;

/// Resolve the open intervals for a rule/exception set over `[from, to)`,
/// with the default DST gap policy.
pub fn resolve_open_intervals(
    rules: &[AvailabilityRule],
    exceptions: &[AvailabilityException],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<Interval> {
    resolve_open_intervals_with(rules, exceptions, from, to, GapPolicy::default())
}

/// Resolve the open intervals for a rule/exception set over `[from, to)`.
///
/// 1. Every horizon date matching a rule's weekday set contributes the rule's
///    local time range, converted to UTC in the rule's zone.
/// 2. Open exceptions are unioned in on top of the rule-derived base.
/// 3. Block exceptions are subtracted last, so a block always wins where it
///    overlaps an open exception.
///
/// The result is disjoint, coalesced into maximal runs, and sorted by start.
pub fn resolve_open_intervals_with(
    rules: &[AvailabilityRule],
    exceptions: &[AvailabilityException],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    policy: GapPolicy,
) -> Vec<Interval> {
    let to = to.min(from + Duration::days(MAX_HORIZON_DAYS));
    if from >= to {
        return Vec::new();
    }
    let horizon = Interval::new(from, to);

    let mut open: Vec<Interval> = Vec::new();
    for rule in rules {
        expand_rule(rule, &horizon, policy, &mut open);
    }
    for ex in exceptions {
        if ex.kind == ExceptionKind::Open {
            if let Some(clipped) = ex.window.intersect(&horizon) {
                open.push(clipped);
            }
        }
    }

    let mut open = merge_intervals(open);
    for ex in exceptions {
        if ex.kind == ExceptionKind::Block {
            open = subtract(open, &ex.window);
        }
    }
    open
}

/// The first open interval that can hold `duration_min` contiguous minutes.
///
/// `open` must be sorted by start (resolver output).
pub fn first_fit(open: &[Interval], duration_min: u32) -> Option<Interval> {
    open.iter()
        .find(|iv| iv.duration_minutes() >= i64::from(duration_min))
        .copied()
}

/// Coalesce touching or overlapping intervals into maximal runs.
///
/// Returns a sorted, disjoint list; empty inputs are dropped.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|iv| iv.start < iv.end);
    if intervals.is_empty() {
        return intervals;
    }
    intervals.sort_by_key(|iv| (iv.start, iv.end));

    let mut merged: Vec<Interval> = Vec::new();
    for iv in intervals {
        if let Some(last) = merged.last_mut() {
            if iv.start <= last.end {
                // Overlapping or touching — extend the current run.
                last.end = last.end.max(iv.end);
                continue;
            }
        }
        merged.push(iv);
    }
    merged
}

/// Expand one weekly rule over every matching local date in the horizon,
/// clipping each occurrence to the horizon.
fn expand_rule(
    rule: &AvailabilityRule,
    horizon: &Interval,
    policy: GapPolicy,
    out: &mut Vec<Interval>,
) {
    // A local-day occurrence can straddle the UTC horizon edge, so scan one
    // extra day on each side and clip.
    let first = horizon.start.with_timezone(&rule.tz).date_naive() - Duration::days(1);
    let last = horizon.end.with_timezone(&rule.tz).date_naive() + Duration::days(1);

    let mut date = first;
    while date <= last {
        if rule.applies_on(date.weekday()) {
            let start = local_to_utc(rule.tz, date.and_time(rule.start), policy);
            let end = local_to_utc(rule.tz, date.and_time(rule.end), policy);
            if let (Some(start), Some(end)) = (start, end) {
                if start < end {
                    if let Some(clipped) = Interval::new(start, end).intersect(horizon) {
                        out.push(clipped);
                    }
                }
            }
        }
        date += Duration::days(1);
    }
}

/// Remove `block` from a sorted, disjoint interval list.
fn subtract(open: Vec<Interval>, block: &Interval) -> Vec<Interval> {
    let mut out = Vec::with_capacity(open.len() + 1);
    for iv in open {
        if !iv.overlaps(block) {
            out.push(iv);
            continue;
        }
        if iv.start < block.start {
            out.push(Interval::new(iv.start, block.start));
        }
        if block.end < iv.end {
            out.push(Interval::new(block.end, iv.end));
        }
    }
    out
}
