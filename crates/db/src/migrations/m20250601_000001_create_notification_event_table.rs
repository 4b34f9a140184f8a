//! Create notification_event table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationEvent::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationEvent::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationEvent::EventName).string().not_null())
                    .col(ColumnDef::new(NotificationEvent::EventVersion).string().null())
                    .col(
                        ColumnDef::new(NotificationEvent::Payload)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationEvent::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationEvent::Status)
                            .string_len(16)
                            .not_null()
                            .default("queued"),
                    )
                    .col(ColumnDef::new(NotificationEvent::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(NotificationEvent::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationEvent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationEvent::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Operators look up stuck or failed events by status
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_event_status")
                    .table(NotificationEvent::Table)
                    .col(NotificationEvent::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_event_created_at")
                    .table(NotificationEvent::Table)
                    .col(NotificationEvent::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationEvent::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum NotificationEvent {
    Table,
    Id,
    EventType,
    EventName,
    EventVersion,
    Payload,
    Metadata,
    Status,
    ErrorMessage,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}
