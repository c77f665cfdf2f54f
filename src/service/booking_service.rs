//! Booking service: the single entry point used by the HTTP layer.

use std::sync::Arc;

use super::booking_engine::{BookingEngine, PeriodRequest};
use super::conflict_checker;
use super::notifier::{Notifier, StoreNotifier};
use super::slot_lock_manager::{HoldReceipt, SlotLockManager};
use super::status_workflow::StatusWorkflow;
use crate::blob::BlobStore;
use crate::clock::Clock;
use crate::domain::market::validate_layout;
use crate::domain::{
    Booking, BookingId, BookingKind, BookingStatus, DateRange, EventBus, LockId, Market, MarketId,
    Notification, NotificationId, PaymentEvidence, PaymentStatus, SlotDefinition, SlotId, UserId,
    UserProfile,
};
use crate::error::BookingError;
use crate::store::DocumentStore;

/// Fields of a new market.
#[derive(Debug, Clone, Default)]
pub struct NewMarket {
    /// Display name, required.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Human-readable location.
    pub location: String,
    /// Initial slot layout.
    pub layout: Vec<SlotDefinition>,
}

/// Orchestration layer for every booking operation.
///
/// Owns the store, clock and collaborators and wires them into the
/// [`SlotLockManager`], [`BookingEngine`] and [`StatusWorkflow`]. Every
/// operation takes the acting user explicitly.
#[derive(Debug, Clone)]
pub struct BookingService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    locks: SlotLockManager,
    engine: BookingEngine,
    workflow: StatusWorkflow,
}

impl BookingService {
    /// Creates a service whose notifications are stored in `store` and
    /// published on `event_bus`.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        blobs: Arc<dyn BlobStore>,
        event_bus: EventBus,
    ) -> Self {
        let notifier: Arc<dyn Notifier> =
            Arc::new(StoreNotifier::new(Arc::clone(&store), event_bus.clone()));
        Self::with_notifier(store, clock, blobs, notifier, event_bus)
    }

    /// Creates a service with a custom [`Notifier`].
    #[must_use]
    pub fn with_notifier(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            locks: SlotLockManager::new(Arc::clone(&store), Arc::clone(&clock)),
            engine: BookingEngine::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&notifier),
            ),
            workflow: StatusWorkflow::new(Arc::clone(&store), Arc::clone(&clock), notifier, blobs),
            store,
            clock,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Creates a market owned by `caller`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a blank name or an invalid layout.
    pub async fn create_market(
        &self,
        caller: &UserId,
        new: NewMarket,
    ) -> Result<Market, BookingError> {
        if new.name.trim().is_empty() {
            return Err(BookingError::InvalidArgument(
                "market name is required".to_string(),
            ));
        }
        validate_layout(&new.layout)?;
        let now = self.clock.now();
        let market = Market {
            id: MarketId::new(),
            name: new.name.trim().to_string(),
            description: new.description,
            location: new.location,
            owner_id: caller.clone(),
            layout: new.layout,
            created_at: now,
            updated_at: now,
        };
        self.store.put_market(&market).await?;
        tracing::info!(market_id = %market.id, owner = %caller, "market created");
        Ok(market)
    }

    /// Replaces a market's slot layout. Owner only.
    ///
    /// Existing bookings keep referencing their slot ids even if the new
    /// layout drops them.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, or `InvalidArgument` for duplicate
    /// or blank slot ids.
    pub async fn replace_layout(
        &self,
        caller: &UserId,
        market_id: MarketId,
        layout: Vec<SlotDefinition>,
    ) -> Result<Market, BookingError> {
        let mut market = self.market(market_id).await?;
        market.require_owner(caller)?;
        validate_layout(&layout)?;
        market.layout = layout;
        market.updated_at = self.clock.now();
        self.store.put_market(&market).await?;
        tracing::info!(%market_id, slots = market.layout.len(), "layout replaced");
        Ok(market)
    }

    /// Looks up a market.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    pub async fn market(&self, market_id: MarketId) -> Result<Market, BookingError> {
        self.store
            .get_market(market_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("market {market_id}")))
    }

    /// Lists all markets, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_markets(&self) -> Result<Vec<Market>, BookingError> {
        Ok(self.store.list_markets().await?)
    }

    /// Returns the caller's profile, empty if none was saved.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn profile(&self, user_id: &UserId) -> Result<UserProfile, BookingError> {
        Ok(self.store.get_profile(user_id).await?.unwrap_or_default())
    }

    /// Saves the caller's profile. Existing bookings keep their snapshot.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save_profile(
        &self,
        user_id: &UserId,
        profile: UserProfile,
    ) -> Result<UserProfile, BookingError> {
        self.store.put_profile(user_id, &profile).await?;
        Ok(profile)
    }

    /// See [`SlotLockManager::hold_slot`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `AlreadyHeld` or `Conflict`.
    pub async fn hold_slot(
        &self,
        caller: &UserId,
        market_id: MarketId,
        slot_id: SlotId,
        range: DateRange,
    ) -> Result<HoldReceipt, BookingError> {
        self.locks.hold_slot(market_id, slot_id, range, caller).await
    }

    /// See [`BookingEngine::confirm_booking`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied`, `FailedPrecondition`,
    /// `DeadlineExceeded`, `InvalidArgument` or `Conflict`.
    pub async fn confirm_booking(
        &self,
        caller: &UserId,
        lock_id: &LockId,
        kind: BookingKind,
        evidence: Option<PaymentEvidence>,
    ) -> Result<Booking, BookingError> {
        self.engine
            .confirm_booking(caller, lock_id, kind, evidence)
            .await
    }

    /// See [`BookingEngine::create_booking_direct`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound` or `Conflict`.
    pub async fn create_booking_direct(
        &self,
        caller: &UserId,
        market_id: MarketId,
        slot_id: SlotId,
        period: &PeriodRequest,
    ) -> Result<Booking, BookingError> {
        self.engine
            .create_booking_direct(caller, market_id, slot_id, period)
            .await
    }

    /// Reports whether `range` on the slot is taken right now.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn has_conflict(
        &self,
        market_id: MarketId,
        slot_id: &SlotId,
        range: &DateRange,
    ) -> Result<bool, BookingError> {
        let mut tx = self.store.begin().await?;
        let taken = conflict_checker::has_conflict(
            tx.as_mut(),
            market_id,
            slot_id,
            range,
            self.clock.now(),
        )
        .await?;
        Ok(taken)
    }

    /// Reads one booking. Visible to its requester and the market owner.
    ///
    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied`.
    pub async fn booking(
        &self,
        caller: &UserId,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
        if &booking.user_id != caller {
            self.market(booking.market_id).await?.require_owner(caller)?;
        }
        Ok(booking)
    }

    /// See [`BookingEngine::bookings_by_market`].
    ///
    /// # Errors
    ///
    /// `NotFound` if the market does not exist.
    pub async fn bookings_by_market(
        &self,
        market_id: MarketId,
        active_only: bool,
    ) -> Result<Vec<Booking>, BookingError> {
        self.engine.bookings_by_market(market_id, active_only).await
    }

    /// Bookings requested by `caller`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn my_bookings(&self, caller: &UserId) -> Result<Vec<Booking>, BookingError> {
        self.engine.bookings_for_user(caller).await
    }

    /// See [`StatusWorkflow::update_booking_status`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied` or `FailedPrecondition`.
    pub async fn update_booking_status(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking, BookingError> {
        self.workflow
            .update_booking_status(caller, booking_id, next)
            .await
    }

    /// See [`StatusWorkflow::update_payment_status`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied` or `FailedPrecondition`.
    pub async fn update_payment_status(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        next: PaymentStatus,
    ) -> Result<Booking, BookingError> {
        self.workflow
            .update_payment_status(caller, booking_id, next)
            .await
    }

    /// See [`StatusWorkflow::upload_payment_evidence`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound`, `PermissionDenied`,
    /// `FailedPrecondition`, or a blob store failure.
    pub async fn upload_payment_evidence(
        &self,
        caller: &UserId,
        booking_id: BookingId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Booking, BookingError> {
        self.workflow
            .upload_payment_evidence(caller, booking_id, file_name, bytes)
            .await
    }

    /// See [`StatusWorkflow::cancel_booking`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied` or `FailedPrecondition`.
    pub async fn cancel_booking(
        &self,
        caller: &UserId,
        booking_id: BookingId,
    ) -> Result<Booking, BookingError> {
        self.workflow.cancel_booking(caller, booking_id).await
    }

    /// Notifications addressed to `caller`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn notifications(&self, caller: &UserId) -> Result<Vec<Notification>, BookingError> {
        Ok(self.store.notifications_for_user(caller).await?)
    }

    /// Marks one of the caller's notifications read.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `PermissionDenied` if it is addressed to someone
    /// else.
    pub async fn mark_notification_read(
        &self,
        caller: &UserId,
        id: NotificationId,
    ) -> Result<(), BookingError> {
        let notification = self
            .store
            .get_notification(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("notification {id}")))?;
        if &notification.to_user_id != caller {
            return Err(BookingError::PermissionDenied(format!(
                "notification {id} is addressed to another user"
            )));
        }
        self.store.mark_notification_read(id).await?;
        Ok(())
    }

    /// See [`SlotLockManager::purge_expired`].
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn purge_expired_locks(&self) -> Result<u64, BookingError> {
        self.locks.purge_expired().await
    }
}
