//! Dispatch services.

pub mod notification;
pub mod processor;

pub use notification::NotificationService;
pub use processor::{EventProcessor, ProcessOutcome};
