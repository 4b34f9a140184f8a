//! Notification record entity.
//!
//! One row per (event, recipient). This is the canonical in-app copy of a
//! notification and exists whether or not any push was delivered.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who the recipient is in relation to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "staff")]
    Staff,
}

/// Notification priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub event_id: String,

    pub event_type: String,

    #[sea_orm(indexed)]
    pub recipient_id: String,

    pub recipient_type: RecipientType,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// String-keyed data forwarded to the client
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub action_url: Option<String>,

    /// Location context for geospatial sends (`latitude`, `longitude`, `distanceKm`)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub location: Option<Json>,

    pub priority: Priority,

    #[sea_orm(nullable)]
    pub expires_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_log::Entity")]
    DeliveryLog,
}

impl Related<super::delivery_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
