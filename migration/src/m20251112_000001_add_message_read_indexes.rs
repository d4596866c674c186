use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Messages {
    Table,
    ConversationId,
    IsRead,
    SenderId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Serves both the unread badge count and the mark-all-read sweep.
        manager
            .create_index(
                Index::create()
                    .name("idx_messages_conversation_is_read_sender")
                    .table(Messages::Table)
                    .col(Messages::ConversationId)
                    .col(Messages::IsRead)
                    .col(Messages::SenderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_messages_conversation_is_read_sender")
                    .table(Messages::Table)
                    .to_owned(),
            )
            .await
    }
}
