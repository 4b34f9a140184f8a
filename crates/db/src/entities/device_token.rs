//! Device token entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Consecutive failures after which a token is no longer selected for sends.
pub const MAX_CONSECUTIVE_FAILURES: i32 = 3;

/// Device platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[sea_orm(string_value = "ios")]
    Ios,
    #[sea_orm(string_value = "android")]
    Android,
    #[sea_orm(string_value = "web")]
    Web,
}

/// A registered push-capable device.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning user
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Provider registration token
    #[sea_orm(column_type = "Text", unique)]
    pub token: String,

    pub platform: Platform,

    #[sea_orm(default_value = true)]
    pub active: bool,

    /// Failed sends since the last success
    #[sea_orm(default_value = 0)]
    pub consecutive_failures: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_failure_reason: Option<String>,

    /// Last successful send
    #[sea_orm(nullable)]
    pub last_used_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether this token may be used for a send.
    #[must_use]
    pub const fn is_deliverable(&self) -> bool {
        self.active && self.consecutive_failures < MAX_CONSECUTIVE_FAILURES
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
