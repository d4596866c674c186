pub use sea_orm_migration::prelude::*;

mod m20251105_000001_create_users_table;
mod m20251105_000002_create_conversations_table;
mod m20251105_000003_create_messages_table;
mod m20251112_000001_add_message_read_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251105_000001_create_users_table::Migration),
            Box::new(m20251105_000002_create_conversations_table::Migration),
            Box::new(m20251105_000003_create_messages_table::Migration),
            Box::new(m20251112_000001_add_message_read_indexes::Migration),
        ]
    }
}
