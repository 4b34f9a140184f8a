//! Database entities.

#![allow(missing_docs)]

pub mod delivery_log;
pub mod device_token;
pub mod notification_event;
pub mod notification_record;
pub mod user_location;

pub use delivery_log::Entity as DeliveryLog;
pub use device_token::Entity as DeviceToken;
pub use notification_event::Entity as NotificationEvent;
pub use notification_record::Entity as NotificationRecord;
pub use user_location::Entity as UserLocation;
