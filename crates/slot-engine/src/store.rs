//! Validated storage for listings, rules, exceptions, services, and requests.
//!
//! The store performs no resolution; it rejects malformed input at the
//! boundary and keeps schedule state consistent. Unknown timezones are fatal
//! here, at save time — a listing must never silently lose availability
//! because of a rule the resolver can't interpret.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{EngineError, Result};
use crate::types::{
    AvailabilityException, AvailabilityRule, ExceptionId, ExceptionKind, Interval, Listing,
    ListingId, Request, RequestId, RequestStatus, RuleSpec, Service, ServiceId, ServiceTerms,
    UserId,
};

/// Most candidate windows a single request may carry.
pub const MAX_REQUEST_WINDOWS: usize = 3;

/// In-memory rows for one deployment's schedule state.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    next_id: u64,
    listings: HashMap<ListingId, Listing>,
    rules: HashMap<ListingId, Vec<AvailabilityRule>>,
    exceptions: HashMap<ListingId, Vec<AvailabilityException>>,
    exception_owner: HashMap<ExceptionId, ListingId>,
    services: HashMap<ServiceId, Service>,
    requests: HashMap<RequestId, Request>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn create_listing(
        &mut self,
        owner: UserId,
        timezone: &str,
        capacity: u32,
    ) -> Result<ListingId> {
        if capacity == 0 {
            return Err(EngineError::Validation(
                "listing capacity must be positive".into(),
            ));
        }
        let tz = parse_timezone(timezone)?;
        let id = ListingId(self.next_id());
        self.listings.insert(
            id,
            Listing {
                id,
                owner,
                timezone: tz,
                capacity,
            },
        );
        Ok(id)
    }

    pub fn listing(&self, id: ListingId) -> Result<&Listing> {
        self.listings
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("listing {id}")))
    }

    /// Look up a listing and require `actor` to own it. Ownership failures
    /// are distinct from not-found.
    pub fn owned_listing(&self, actor: UserId, id: ListingId) -> Result<&Listing> {
        let listing = self.listing(id)?;
        if listing.owner != actor {
            return Err(EngineError::Ownership(format!("listing {id}")));
        }
        Ok(listing)
    }

    /// Remove a listing and everything it owns: rules, exceptions, services,
    /// and requests.
    pub fn remove_listing(&mut self, actor: UserId, id: ListingId) -> Result<()> {
        self.owned_listing(actor, id)?;
        self.listings.remove(&id);
        self.rules.remove(&id);
        if let Some(exs) = self.exceptions.remove(&id) {
            for ex in exs {
                self.exception_owner.remove(&ex.id);
            }
        }
        self.services.retain(|_, s| s.listing_id != id);
        self.requests.retain(|_, r| r.listing_id != id);
        Ok(())
    }

    pub fn add_service(
        &mut self,
        actor: UserId,
        listing_id: ListingId,
        terms: ServiceTerms,
    ) -> Result<ServiceId> {
        self.owned_listing(actor, listing_id)?;
        if terms.duration_min == 0 {
            return Err(EngineError::Validation(
                "service duration must be positive".into(),
            ));
        }
        let id = ServiceId(self.next_id());
        self.services.insert(
            id,
            Service {
                id,
                listing_id,
                terms,
            },
        );
        Ok(id)
    }

    pub fn service(&self, id: ServiceId) -> Result<&Service> {
        self.services
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("service {id}")))
    }

    /// Replace the listing's whole rule set atomically.
    ///
    /// The incoming set is validated in full before the stored one is
    /// touched — a reader never observes a mix of old and new rules.
    pub fn replace_rules(
        &mut self,
        actor: UserId,
        listing_id: ListingId,
        rules: Vec<RuleSpec>,
    ) -> Result<()> {
        self.owned_listing(actor, listing_id)?;
        let mut validated = Vec::with_capacity(rules.len());
        for spec in rules {
            validated.push(validate_rule(spec)?);
        }
        self.rules.insert(listing_id, validated);
        Ok(())
    }

    pub fn rules(&self, listing_id: ListingId) -> &[AvailabilityRule] {
        self.rules
            .get(&listing_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_exception(
        &mut self,
        actor: UserId,
        listing_id: ListingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kind: ExceptionKind,
        reason: Option<String>,
    ) -> Result<ExceptionId> {
        self.owned_listing(actor, listing_id)?;
        if end <= start {
            return Err(EngineError::Validation(
                "exception window must end after it starts".into(),
            ));
        }
        let id = ExceptionId(self.next_id());
        self.exceptions
            .entry(listing_id)
            .or_default()
            .push(AvailabilityException {
                id,
                window: Interval::new(start, end),
                kind,
                reason,
            });
        self.exception_owner.insert(id, listing_id);
        Ok(id)
    }

    /// Remove a single exception. A missing id is reported as not-found,
    /// never silently ignored.
    pub fn remove_exception(&mut self, actor: UserId, id: ExceptionId) -> Result<()> {
        let listing_id = *self
            .exception_owner
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("exception {id}")))?;
        self.owned_listing(actor, listing_id)?;
        if let Some(list) = self.exceptions.get_mut(&listing_id) {
            list.retain(|ex| ex.id != id);
        }
        self.exception_owner.remove(&id);
        Ok(())
    }

    pub fn exceptions(&self, listing_id: ListingId) -> &[AvailabilityException] {
        self.exceptions
            .get(&listing_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn create_request(
        &mut self,
        customer: UserId,
        listing_id: ListingId,
        service_id: Option<ServiceId>,
        windows: Vec<Interval>,
    ) -> Result<RequestId> {
        self.listing(listing_id)?;
        if windows.is_empty() || windows.len() > MAX_REQUEST_WINDOWS {
            return Err(EngineError::Validation(format!(
                "a request carries 1 to {MAX_REQUEST_WINDOWS} candidate windows"
            )));
        }
        for w in &windows {
            if w.end <= w.start {
                return Err(EngineError::Validation(
                    "candidate window must end after it starts".into(),
                ));
            }
        }
        if let Some(sid) = service_id {
            let service = self.service(sid)?;
            if service.listing_id != listing_id {
                return Err(EngineError::Validation(format!(
                    "service {sid} does not belong to listing {listing_id}"
                )));
            }
        }
        let id = RequestId(self.next_id());
        self.requests.insert(
            id,
            Request {
                id,
                listing_id,
                service_id,
                customer,
                windows,
                status: RequestStatus::Pending,
                accepted_window: None,
                reserved: None,
            },
        );
        Ok(id)
    }

    pub fn request(&self, id: RequestId) -> Result<&Request> {
        self.requests
            .get(&id)
            .ok_or_else(|| EngineError::NotFound(format!("request {id}")))
    }

    /// Flip a pending request to accepted, recording the chosen window and
    /// the reserved effective interval. The engine is the sole caller.
    pub(crate) fn mark_accepted(&mut self, id: RequestId, window: Interval, reserved: Interval) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.status = RequestStatus::Accepted;
            request.accepted_window = Some(window);
            request.reserved = Some(reserved);
        }
    }

    /// Flip a pending request to declined. The engine is the sole caller.
    pub(crate) fn mark_declined(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.status = RequestStatus::Declined;
        }
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}

fn validate_rule(spec: RuleSpec) -> Result<AvailabilityRule> {
    if spec.days.is_empty() {
        return Err(EngineError::Validation(
            "rule weekday set must not be empty".into(),
        ));
    }
    if spec.start >= spec.end {
        return Err(EngineError::Validation(format!(
            "rule start {} must precede end {}",
            spec.start, spec.end
        )));
    }
    let tz = parse_timezone(&spec.timezone)?;
    // Canonical Monday-first order makes identical rule sets compare equal
    // regardless of input order.
    let mut days = spec.days;
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    Ok(AvailabilityRule {
        days,
        start: spec.start,
        end: spec.end,
        tz,
    })
}
