//! Create notification_record table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationRecord::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationRecord::EventId).string().not_null())
                    .col(
                        ColumnDef::new(NotificationRecord::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecord::RecipientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecord::RecipientType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationRecord::Title).string().not_null())
                    .col(ColumnDef::new(NotificationRecord::Body).text().not_null())
                    .col(
                        ColumnDef::new(NotificationRecord::Data)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationRecord::ImageUrl).text().null())
                    .col(ColumnDef::new(NotificationRecord::ActionUrl).text().null())
                    .col(
                        ColumnDef::new(NotificationRecord::Location)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecord::Priority)
                            .string_len(16)
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(NotificationRecord::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_record_event")
                            .from(NotificationRecord::Table, NotificationRecord::EventId)
                            .to(NotificationEvent::Table, NotificationEvent::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_record_event_id")
                    .table(NotificationRecord::Table)
                    .col(NotificationRecord::EventId)
                    .to_owned(),
            )
            .await?;

        // In-app inbox listing: newest first per recipient
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_record_recipient_created")
                    .table(NotificationRecord::Table)
                    .col(NotificationRecord::RecipientId)
                    .col(NotificationRecord::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationRecord::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum NotificationRecord {
    Table,
    Id,
    EventId,
    EventType,
    RecipientId,
    RecipientType,
    Title,
    Body,
    Data,
    ImageUrl,
    ActionUrl,
    Location,
    Priority,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum NotificationEvent {
    Table,
    Id,
}
