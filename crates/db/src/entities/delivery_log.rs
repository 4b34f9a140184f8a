//! Delivery log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    #[sea_orm(string_value = "push")]
    Push,
    #[sea_orm(string_value = "in_app")]
    InApp,
}

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub notification_id: String,

    pub channel: DeliveryChannel,

    pub status: DeliveryStatus,

    /// Provider name, e.g. `fcm`
    pub provider: String,

    #[sea_orm(nullable)]
    pub provider_message_id: Option<String>,

    /// Raw per-token report
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub provider_response: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::notification_record::Entity",
        from = "Column::NotificationId",
        to = "super::notification_record::Column::Id",
        on_delete = "Cascade"
    )]
    NotificationRecord,
}

impl Related<super::notification_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
