//! DST transition handling for rule expansion.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Policy for local times that fall inside a spring-forward gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Drop the occurrence whose boundary falls in the gap.
    Skip,
    /// Shift the wall-clock time forward by the length of the gap.
    #[default]
    ShiftForward,
}

/// Convert a local wall-clock datetime to UTC in the given zone.
///
/// Ambiguous times (fall-back fold) resolve to the earlier instant.
/// Nonexistent times (spring-forward gap) follow `policy`; `None` means the
/// occurrence is skipped.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime, policy: GapPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => match policy {
            GapPolicy::Skip => None,
            GapPolicy::ShiftForward => {
                // Standard gaps are one hour; a shifted time still inside a
                // gap is skipped.
                match tz.from_local_datetime(&(local + Duration::hours(1))) {
                    LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
                    LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
                    LocalResult::None => None,
                }
            }
        },
    }
}
