//! Notification event entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Processing status of an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Written by the producer, not yet picked up.
    #[default]
    #[sea_orm(string_value = "queued")]
    #[serde(alias = "received")]
    Queued,
    /// A processor is working on it.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// All handler side effects completed.
    #[sea_orm(string_value = "processed")]
    Processed,
    /// The handler raised an error; see `error_message`.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl EventStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Event type, e.g. `ORDER_CONFIRMED`. Stored as free text so unknown
    /// types written by producers can still be loaded and failed.
    pub event_type: String,

    pub event_name: String,

    #[sea_orm(nullable)]
    pub event_version: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,

    /// Producer hints such as `notificationRadius`.
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,

    #[sea_orm(indexed)]
    pub status: EventStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    #[sea_orm(nullable)]
    pub processed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
