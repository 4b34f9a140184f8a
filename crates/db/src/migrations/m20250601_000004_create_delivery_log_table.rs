//! Create delivery_log table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryLog::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeliveryLog::NotificationId).string().not_null())
                    .col(ColumnDef::new(DeliveryLog::Channel).string_len(16).not_null())
                    .col(ColumnDef::new(DeliveryLog::Status).string_len(16).not_null())
                    .col(ColumnDef::new(DeliveryLog::Provider).string_len(32).not_null())
                    .col(ColumnDef::new(DeliveryLog::ProviderMessageId).string().null())
                    .col(
                        ColumnDef::new(DeliveryLog::ProviderResponse)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_log_notification")
                            .from(DeliveryLog::Table, DeliveryLog::NotificationId)
                            .to(NotificationRecord::Table, NotificationRecord::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_log_notification_id")
                    .table(DeliveryLog::Table)
                    .col(DeliveryLog::NotificationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryLog::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum DeliveryLog {
    Table,
    Id,
    NotificationId,
    Channel,
    Status,
    Provider,
    ProviderMessageId,
    ProviderResponse,
    CreatedAt,
}

#[derive(Iden)]
enum NotificationRecord {
    Table,
    Id,
}
