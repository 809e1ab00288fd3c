//! Patrons repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::patron::Patron,
};

/// Identity lookup used by the lending core
#[async_trait]
pub trait PatronsRepository: Send + Sync {
    /// Get patron by ID
    async fn get_by_id(&self, id: Uuid) -> AppResult<Patron>;
}

#[derive(Clone)]
pub struct PgPatronsRepository {
    pool: Pool<Postgres>,
}

impl PgPatronsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatronsRepository for PgPatronsRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Patron> {
        sqlx::query_as::<_, Patron>("SELECT id, name, email, books_read FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}
