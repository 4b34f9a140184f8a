//! User location repository and radius lookups.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, Set, Statement,
};

use crate::entities::user_location::{ActiveModel, Entity, Model};
use dealdrop_common::{AppError, AppResult};

/// A user returned by a radius lookup.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct NearbyUserRow {
    /// User ID
    pub user_id: String,
    /// Distance from the query origin in kilometres
    pub distance_km: f64,
    /// Kind of stored location
    pub location_type: String,
    /// The user's own preferred radius
    pub notification_radius_km: f64,
}

/// Great-circle distance in SQL, mean earth radius 6371 km.
///
/// The bounding box on latitude lets the planner use the lat/lng index before
/// the trigonometry runs. `LEAST(1.0, ...)` keeps `acos` in domain when the
/// points coincide.
const NEARBY_USERS_SQL: &str = r"
    SELECT user_id, distance_km, location_type, notification_radius_km
    FROM (
        SELECT
            user_id,
            location_type,
            notification_radius_km,
            6371.0 * acos(LEAST(1.0,
                cos(radians($1)) * cos(radians(latitude)) * cos(radians(longitude) - radians($2))
                + sin(radians($1)) * sin(radians(latitude))
            )) AS distance_km
        FROM user_location
        WHERE latitude BETWEEN $1 - ($3 / 111.0) AND $1 + ($3 / 111.0)
    ) AS candidates
    WHERE distance_km <= $3
    ORDER BY distance_km ASC
";

/// Repository for user locations.
#[derive(Clone)]
pub struct UserLocationRepository {
    db: Arc<DatabaseConnection>,
}

impl UserLocationRepository {
    /// Create a new user location repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's stored location.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or replace a user's location.
    pub async fn upsert(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
        location_type: &str,
        notification_radius_km: f64,
    ) -> AppResult<Model> {
        let existing = self.find_by_user(user_id).await?;
        let mut active = ActiveModel {
            user_id: Set(user_id.to_string()),
            ..Default::default()
        };
        active.latitude = Set(latitude);
        active.longitude = Set(longitude);
        active.location_type = Set(location_type.to_string());
        active.notification_radius_km = Set(notification_radius_km);
        active.updated_at = Set(Utc::now().into());

        let result = if existing.is_some() {
            active.update(self.db.as_ref()).await
        } else {
            active.insert(self.db.as_ref()).await
        };
        result.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users whose stored location lies within `radius_km` of the origin,
    /// nearest first.
    pub async fn find_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> AppResult<Vec<NearbyUserRow>> {
        NearbyUserRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEARBY_USERS_SQL,
            [latitude.into(), longitude.into(), radius_km.into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn nearby_row(user_id: &str, distance_km: f64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("user_id", Value::from(user_id.to_string())),
            ("distance_km", Value::from(distance_km)),
            ("location_type", Value::from("current".to_string())),
            ("notification_radius_km", Value::from(10.0_f64)),
        ])
    }

    #[tokio::test]
    async fn test_find_within_radius_maps_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[nearby_row("u1", 1.2), nearby_row("u2", 4.9)]])
                .into_connection(),
        );

        let repo = UserLocationRepository::new(db);
        let users = repo.find_within_radius(52.52, 13.405, 5.0).await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "u1");
        assert!((users[1].distance_km - 4.9).abs() < f64::EPSILON);
        assert_eq!(users[0].location_type, "current");
    }

    #[tokio::test]
    async fn test_find_within_radius_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([sea_orm::DbErr::Custom(
                    "function acos does not exist".to_string(),
                )])
                .into_connection(),
        );

        let repo = UserLocationRepository::new(db);
        let result = repo.find_within_radius(0.0, 0.0, 5.0).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_find_by_user_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = UserLocationRepository::new(db);
        assert!(repo.find_by_user("u1").await.unwrap().is_none());
    }
}
