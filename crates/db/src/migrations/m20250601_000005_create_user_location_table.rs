//! Create user_location table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserLocation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserLocation::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserLocation::Latitude).double().not_null())
                    .col(ColumnDef::new(UserLocation::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(UserLocation::LocationType)
                            .string_len(16)
                            .not_null()
                            .default("current"),
                    )
                    .col(
                        ColumnDef::new(UserLocation::NotificationRadiusKm)
                            .double()
                            .not_null()
                            .default(10.0),
                    )
                    .col(
                        ColumnDef::new(UserLocation::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Bounding-box prefilter for radius queries
        manager
            .create_index(
                Index::create()
                    .name("idx_user_location_lat_lng")
                    .table(UserLocation::Table)
                    .col(UserLocation::Latitude)
                    .col(UserLocation::Longitude)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserLocation::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum UserLocation {
    Table,
    UserId,
    Latitude,
    Longitude,
    LocationType,
    NotificationRadiusKm,
    UpdatedAt,
}
