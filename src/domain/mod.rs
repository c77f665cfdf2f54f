//! Domain layer: identifiers, ranges, records and status rules.
//!
//! Everything in here is storage-agnostic and synchronous apart from the
//! [`EventBus`]. Transactional orchestration lives in [`crate::service`].

pub mod booking;
pub mod date_range;
pub mod event_bus;
pub mod ids;
pub mod market;
pub mod notification;
pub mod slot_lock;
pub mod status;

pub use booking::{
    Booking, BookingKind, BookingPeriod, ContactSnapshot, PaymentEvidence, PriceSnapshot,
    UserProfile,
};
pub use date_range::DateRange;
pub use event_bus::EventBus;
pub use ids::{BookingId, LockId, MarketId, NotificationId, SlotId, UserId};
pub use market::{GridPosition, Market, SlotCapability, SlotDefinition};
pub use notification::{Notification, NotificationKind};
pub use slot_lock::{HOLD_WINDOW_MINUTES, LockStatus, SlotLock};
pub use status::{BookingStatus, PaymentStatus};
