//! Create device_token table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceToken::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceToken::UserId).string().not_null())
                    .col(ColumnDef::new(DeviceToken::Token).text().not_null())
                    .col(ColumnDef::new(DeviceToken::Platform).string_len(16).not_null())
                    .col(
                        ColumnDef::new(DeviceToken::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DeviceToken::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DeviceToken::LastFailureReason).text().null())
                    .col(
                        ColumnDef::new(DeviceToken::LastUsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeviceToken::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceToken::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_token_user_id")
                    .table(DeviceToken::Table)
                    .col(DeviceToken::UserId)
                    .to_owned(),
            )
            .await?;

        // One row per provider token
        manager
            .create_index(
                Index::create()
                    .name("idx_device_token_token")
                    .table(DeviceToken::Table)
                    .col(DeviceToken::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_token_active")
                    .table(DeviceToken::Table)
                    .col(DeviceToken::Active)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceToken::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum DeviceToken {
    Table,
    Id,
    UserId,
    Token,
    Platform,
    Active,
    ConsecutiveFailures,
    LastFailureReason,
    LastUsedAt,
    CreatedAt,
    UpdatedAt,
}
