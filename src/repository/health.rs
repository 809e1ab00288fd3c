//! Store connectivity check used by readiness

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::error::AppResult;

#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Round-trip to the backing store
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgStoreHealth {
    pool: Pool<Postgres>,
}

impl PgStoreHealth {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealth for PgStoreHealth {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
