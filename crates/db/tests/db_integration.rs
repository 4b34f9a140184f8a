//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p dealdrop-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `dealdrop_test`)
//!   `TEST_DB_PASSWORD` (default: `dealdrop_test`)
//!   `TEST_DB_NAME` (default: `dealdrop_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use dealdrop_db::entities::device_token::{self, Platform};
use dealdrop_db::entities::notification_event::{self, EventStatus};
use dealdrop_db::repositories::{
    DeviceTokenRepository, NotificationEventRepository, UserLocationRepository,
};
use dealdrop_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;
use serde_json::json;

async fn unique_db() -> (TestDatabase, Arc<sea_orm::DatabaseConnection>) {
    let db = TestDatabase::create_unique().await.unwrap();
    // `DatabaseConnection` is not `Clone` with the `mock` feature; open a
    // second connection to the same unique database instead.
    let conn = Arc::new(
        sea_orm::Database::connect(&db.config.database_url())
            .await
            .unwrap(),
    );
    (db, conn)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_event_status_lifecycle() {
    let (db, conn) = unique_db().await;
    let repo = NotificationEventRepository::new(conn);

    repo.create(notification_event::ActiveModel {
        id: Set("evt1".to_string()),
        event_type: Set("ORDER_READY".to_string()),
        event_name: Set("order.ready".to_string()),
        event_version: Set(None),
        payload: Set(json!({ "orderId": "o1" })),
        metadata: Set(json!({})),
        status: Set(EventStatus::Queued),
        error_message: Set(None),
        processed_at: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    })
    .await
    .unwrap();

    repo.update_status("evt1", EventStatus::Processing, None)
        .await
        .unwrap();
    let done = repo
        .update_status("evt1", EventStatus::Processed, None)
        .await
        .unwrap();

    assert_eq!(done.status, EventStatus::Processed);
    assert!(done.processed_at.is_some());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_token_excluded_after_three_failures() {
    let (db, conn) = unique_db().await;
    let repo = DeviceTokenRepository::new(conn);

    repo.create(device_token::ActiveModel {
        id: Set("dt1".to_string()),
        user_id: Set("user1".to_string()),
        token: Set("tok1".to_string()),
        platform: Set(Platform::Ios),
        active: Set(true),
        consecutive_failures: Set(0),
        last_failure_reason: Set(None),
        last_used_at: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    })
    .await
    .unwrap();

    for _ in 0..2 {
        repo.mark_failure("tok1", "UNAVAILABLE").await.unwrap();
    }
    repo.mark_success("tok1").await.unwrap();
    let token = repo.find_by_token("tok1").await.unwrap().unwrap();
    assert_eq!(token.consecutive_failures, 0);

    for _ in 0..3 {
        repo.mark_failure("tok1", "UNREGISTERED").await.unwrap();
    }
    assert!(repo.find_deliverable_by_user("user1").await.unwrap().is_empty());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_find_within_radius() {
    let (db, conn) = unique_db().await;
    let repo = UserLocationRepository::new(conn);

    // One degree of latitude is ~111.19 km along a meridian.
    let km_per_degree = 111.194_93;
    for (user, km) in [("near1", 1.2), ("near2", 4.9), ("far1", 5.1), ("far2", 10.0)] {
        repo.upsert(user, km / km_per_degree, 0.0, "current", 10.0)
            .await
            .unwrap();
    }

    let users = repo.find_within_radius(0.0, 0.0, 5.0).await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.user_id.as_str()).collect();

    assert_eq!(ids, vec!["near1", "near2"]);

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(config.database_url().starts_with("postgres://"));
}
