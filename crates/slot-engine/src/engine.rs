//! The `BookingEngine` façade — the single decision point over store,
//! resolver, and capacity ledger.
//!
//! All mutation happens under one write lock, so the capacity re-check and
//! the reservation write in [`BookingEngine::accept_request`] form a single
//! atomic transaction, and rule replacement is never observed half-done.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::{EngineError, Result};
use crate::evaluator::{covered_by, effective_interval, notice_violation, Decision, RejectReason};
use crate::ledger::CapacityLedger;
use crate::resolver::{first_fit, resolve_open_intervals};
use crate::store::ScheduleStore;
use crate::types::{
    ExceptionId, ExceptionKind, Interval, Listing, ListingId, Request, RequestId, RequestStatus,
    RuleSpec, ServiceId, ServiceTerms, UserId,
};

#[derive(Debug, Default)]
struct Inner {
    store: ScheduleStore,
    ledger: CapacityLedger,
}

/// Thread-safe booking engine for provider availability and admission.
#[derive(Debug, Default)]
pub struct BookingEngine {
    inner: RwLock<Inner>,
}

impl BookingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Schedule state ──────────────────────────────────────────────────────

    pub fn create_listing(
        &self,
        owner: UserId,
        timezone: &str,
        capacity: u32,
    ) -> Result<ListingId> {
        self.write().store.create_listing(owner, timezone, capacity)
    }

    pub fn listing(&self, id: ListingId) -> Result<Listing> {
        Ok(self.read().store.listing(id)?.clone())
    }

    /// Remove a listing and everything it owns, including its reservations.
    pub fn remove_listing(&self, actor: UserId, id: ListingId) -> Result<()> {
        let mut guard = self.write();
        guard.store.remove_listing(actor, id)?;
        guard.ledger.clear_listing(id);
        Ok(())
    }

    pub fn add_service(
        &self,
        actor: UserId,
        listing_id: ListingId,
        terms: ServiceTerms,
    ) -> Result<ServiceId> {
        self.write().store.add_service(actor, listing_id, terms)
    }

    /// Replace the listing's whole rule set atomically: old set deleted, new
    /// set inserted, one transaction.
    pub fn replace_rules(
        &self,
        actor: UserId,
        listing_id: ListingId,
        rules: Vec<RuleSpec>,
    ) -> Result<()> {
        self.write().store.replace_rules(actor, listing_id, rules)
    }

    pub fn add_exception(
        &self,
        actor: UserId,
        listing_id: ListingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kind: ExceptionKind,
        reason: Option<String>,
    ) -> Result<ExceptionId> {
        self.write()
            .store
            .add_exception(actor, listing_id, start, end, kind, reason)
    }

    pub fn remove_exception(&self, actor: UserId, id: ExceptionId) -> Result<()> {
        self.write().store.remove_exception(actor, id)
    }

    pub fn create_request(
        &self,
        customer: UserId,
        listing_id: ListingId,
        service_id: Option<ServiceId>,
        windows: Vec<Interval>,
    ) -> Result<RequestId> {
        self.write()
            .store
            .create_request(customer, listing_id, service_id, windows)
    }

    pub fn request(&self, id: RequestId) -> Result<Request> {
        Ok(self.read().store.request(id)?.clone())
    }

    // ── Resolution ──────────────────────────────────────────────────────────

    /// Concrete open intervals for a listing over `[from, to)`, disjoint and
    /// sorted. The horizon is capped at [`crate::resolver::MAX_HORIZON_DAYS`].
    pub fn resolve_availability(
        &self,
        listing_id: ListingId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        let guard = self.read();
        guard.store.listing(listing_id)?;
        Ok(resolve_open_intervals(
            guard.store.rules(listing_id),
            guard.store.exceptions(listing_id),
            from,
            to,
        ))
    }

    /// The earliest open interval that can hold `duration_min` contiguous
    /// minutes within `[from, to)`.
    pub fn first_bookable_slot(
        &self,
        listing_id: ListingId,
        duration_min: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Interval>> {
        Ok(first_fit(
            &self.resolve_availability(listing_id, from, to)?,
            duration_min,
        ))
    }

    /// Maximum number of simultaneous reservations at any instant within
    /// `[start, end)`.
    pub fn max_overlap(
        &self,
        listing_id: ListingId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        let guard = self.read();
        guard.store.listing(listing_id)?;
        Ok(guard
            .ledger
            .max_overlap(listing_id, &Interval::new(start, end)))
    }

    // ── Admission ───────────────────────────────────────────────────────────

    /// Evaluate a candidate window against the current schedule and ledger,
    /// with `now` taken from the wall clock.
    pub fn evaluate_candidate(
        &self,
        listing_id: ListingId,
        service_id: Option<ServiceId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decision> {
        self.evaluate_candidate_at(listing_id, service_id, start, end, Utc::now())
    }

    /// Evaluate a candidate window at an explicit `now`.
    ///
    /// Checks run in order: open-window containment, minimum notice, maximum
    /// notice, capacity. The first failure decides the reject reason.
    pub fn evaluate_candidate_at(
        &self,
        listing_id: ListingId,
        service_id: Option<ServiceId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        if end <= start {
            return Err(EngineError::Validation(
                "candidate window must end after it starts".into(),
            ));
        }
        let guard = self.read();
        let listing = guard.store.listing(listing_id)?;
        let terms = match service_id {
            Some(id) => {
                let service = guard.store.service(id)?;
                if service.listing_id != listing_id {
                    return Err(EngineError::Validation(format!(
                        "service {id} does not belong to listing {listing_id}"
                    )));
                }
                service.terms
            }
            None => ServiceTerms::UNRESTRICTED,
        };

        let window = Interval::new(start, end);
        let open = resolve_open_intervals(
            guard.store.rules(listing_id),
            guard.store.exceptions(listing_id),
            start,
            end,
        );
        if !covered_by(&open, &window) {
            return Ok(Decision::rejected(RejectReason::NotInOpenWindow));
        }
        if let Some(reason) = notice_violation(now, start, &terms) {
            return Ok(Decision::rejected(reason));
        }
        let effective = effective_interval(&window, &terms);
        if guard.ledger.max_overlap(listing_id, &effective) >= listing.capacity {
            return Ok(Decision::rejected(RejectReason::CapacityExhausted));
        }
        Ok(Decision::admitted())
    }

    /// Accept a pending request: one atomic transaction that re-checks
    /// capacity against the current ledger, reserves the first candidate
    /// window that still fits, and flips the status pending→accepted.
    ///
    /// Returns the accepted window. If a competing accept consumed the
    /// capacity since the request was evaluated, the transaction aborts with
    /// [`EngineError::SlotConflict`] and the request stays pending, so the
    /// provider can offer an alternative.
    pub fn accept_request(&self, actor: UserId, request_id: RequestId) -> Result<Interval> {
        let mut guard = self.write();
        let inner = &mut *guard;

        let request = inner.store.request(request_id)?.clone();
        let listing = inner.store.owned_listing(actor, request.listing_id)?.clone();
        if request.status != RequestStatus::Pending {
            return Err(EngineError::AlreadyDecided(request_id));
        }
        let terms = match request.service_id {
            Some(id) => inner.store.service(id)?.terms,
            None => ServiceTerms::UNRESTRICTED,
        };

        for window in &request.windows {
            let effective = effective_interval(window, &terms);
            if inner.ledger.max_overlap(request.listing_id, &effective) < listing.capacity {
                inner.ledger.reserve(request.listing_id, effective);
                inner.store.mark_accepted(request_id, *window, effective);
                return Ok(*window);
            }
        }
        Err(EngineError::SlotConflict)
    }

    /// Decline a pending request. Nothing was reserved, so the ledger is not
    /// touched.
    pub fn decline_request(&self, actor: UserId, request_id: RequestId) -> Result<()> {
        let mut guard = self.write();
        let inner = &mut *guard;

        let request = inner.store.request(request_id)?;
        let listing_id = request.listing_id;
        let status = request.status;
        inner.store.owned_listing(actor, listing_id)?;
        if status != RequestStatus::Pending {
            return Err(EngineError::AlreadyDecided(request_id));
        }
        inner.store.mark_declined(request_id);
        Ok(())
    }
}
