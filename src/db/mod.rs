pub mod conversations;
pub mod messages;
pub mod users;

use chrono::SubsecRound;
use sea_orm::{Database, DatabaseConnection, DbErr};

/// Create a SeaORM database connection pool.
pub async fn create_pool(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Current time truncated to microseconds, the precision every supported
/// backend stores. Values handed back to callers then equal what a later
/// read returns.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now().trunc_subsecs(6)
}
