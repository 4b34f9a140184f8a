//! Core dispatch pipeline for dealdrop.
//!
//! An [`EventProcessor`] validates an event, routes it to a handler by type,
//! and tracks its status. Handlers compose messages and hand them to the
//! [`NotificationService`], which resolves device tokens, sends through a
//! [`PushGateway`](push::PushGateway) and persists records and delivery logs
//! through a [`RecordStore`](store::RecordStore).

pub mod domain;
pub mod geo;
pub mod handlers;
pub mod push;
pub mod services;
pub mod store;
pub mod validation;

pub use domain::{DispatchResult, Event, EventType, NotificationMessage};
pub use push::{FcmGateway, PushMode, SharedPushGateway};
pub use services::{EventProcessor, NotificationService, ProcessOutcome};
pub use store::{DatabaseRecordStore, SharedRecordStore};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MemoryRecordStore;
