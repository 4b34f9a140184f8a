//! Database migrations.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_notification_event_table;
mod m20250601_000002_create_device_token_table;
mod m20250601_000003_create_notification_record_table;
mod m20250601_000004_create_delivery_log_table;
mod m20250601_000005_create_user_location_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_notification_event_table::Migration),
            Box::new(m20250601_000002_create_device_token_table::Migration),
            Box::new(m20250601_000003_create_notification_record_table::Migration),
            Box::new(m20250601_000004_create_delivery_log_table::Migration),
            Box::new(m20250601_000005_create_user_location_table::Migration),
        ]
    }
}
