//! Database repositories.

mod delivery_log;
mod device_token;
mod notification_event;
mod notification_record;
mod user_location;

pub use delivery_log::DeliveryLogRepository;
pub use device_token::DeviceTokenRepository;
pub use notification_event::NotificationEventRepository;
pub use notification_record::NotificationRecordRepository;
pub use user_location::{NearbyUserRow, UserLocationRepository};
