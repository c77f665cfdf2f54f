//! # market-booking
//!
//! Booking engine for market stalls. Owners publish a market with a grid
//! of slots; users hold a slot for a day range, confirm the hold into a
//! booking, and the owner drives it through approval and payment.
//!
//! Two users can never end up with overlapping active bookings on the same
//! slot: every check that decides availability runs inside the same
//! serializable transaction as the write it guards.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── BookingService (service/)
//!     │     ├── SlotLockManager   holds
//!     │     ├── BookingEngine     confirm / direct create
//!     │     └── StatusWorkflow    approval, payment, slips
//!     │
//!     ├── Domain records and rules (domain/)
//!     │
//!     └── DocumentStore (store/): in-memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod blob;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
