use moka::future::Cache;
use sea_orm::{DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::db::users as user_db;
use crate::models::users;

/// Short-lived cache of user rows keyed by id, so that the every-few-seconds
/// polling traffic does not hit the users table on each request.
#[derive(Clone)]
pub struct PrincipalCache {
    cache: Cache<Uuid, users::Model>,
}

impl PrincipalCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(10_000)
            .build();

        Self { cache }
    }

    /// Look up the user behind a token, hitting the database on a miss.
    pub async fn resolve(
        &self,
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<Option<users::Model>, DbErr> {
        if let Some(cached) = self.cache.get(&user_id).await {
            return Ok(Some(cached));
        }

        debug!(%user_id, "principal cache miss");
        let user = user_db::get_user_by_id(db, user_id).await?;
        if let Some(ref found) = user {
            self.cache.insert(user_id, found.clone()).await;
        }

        Ok(user)
    }
}
