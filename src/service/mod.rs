//! Service layer: booking concurrency and conflict resolution.
//!
//! [`BookingService`] is the facade the HTTP layer talks to. Underneath it
//! the [`SlotLockManager`] places holds, the [`BookingEngine`] turns holds
//! (or direct requests) into bookings and the [`StatusWorkflow`] moves
//! them through approval and payment. All of them share the conflict
//! checker and report to the counterpart through a [`Notifier`].

pub mod booking_engine;
pub mod booking_service;
pub mod conflict_checker;
pub mod notifier;
pub mod slot_lock_manager;
pub mod status_workflow;

pub use booking_engine::{BookingEngine, PeriodRequest};
pub use booking_service::{BookingService, NewMarket};
pub use conflict_checker::Blocker;
pub use notifier::{Notifier, StoreNotifier, spawn_delivery_log};
pub use slot_lock_manager::{HoldReceipt, SlotLockManager};
pub use status_workflow::StatusWorkflow;
