// src/access.rs

use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::db;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("not found")]
    NotFound,

    #[error("validation: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Сервис доступа к платному контенту. Держит собственный пул и
/// передаётся явно через AppState — никакого глобального клиента.
#[derive(Clone)]
pub struct AccessService {
    pool: PgPool,
}

impl AccessService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// true, если профиль активен и роль admin или author. Без побочных эффектов.
    pub async fn check_admin_permissions(&self, user_id: i32) -> Result<bool, AccessError> {
        let profile = db::get_profile(&self.pool, user_id).await?;

        Ok(profile
            .map(|p| p.is_active && (p.role == "admin" || p.role == "author"))
            .unwrap_or(false))
    }

    /// Ручная выдача доступа админом: бесплатный заказ с ограниченным сроком.
    /// Не идемпотентна — повторный вызов создаёт второй независимый грант.
    pub async fn grant_access(
        &self,
        user_id: i32,
        product_id: i32,
        duration_days: i64,
    ) -> Result<i32, AccessError> {
        if duration_days <= 0 {
            return Err(AccessError::Validation(
                "duration_days must be positive".to_string(),
            ));
        }

        let product = db::get_active_product(&self.pool, product_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        let expires_at = Utc::now() + Duration::days(duration_days);

        let order_id = db::insert_order(
            &self.pool,
            user_id,
            product.id,
            0,
            &product.currency,
            Some(expires_at),
        )
        .await?;

        Ok(order_id)
    }

    /// Отзывает все действующие гранты пары (user, product) разом.
    /// NotFound, если отзывать нечего.
    pub async fn revoke_access(&self, user_id: i32, product_id: i32) -> Result<u64, AccessError> {
        let revoked = db::cancel_active_orders(&self.pool, user_id, product_id).await?;

        if revoked == 0 {
            return Err(AccessError::NotFound);
        }

        Ok(revoked)
    }

    /// Есть ли у пользователя действующий оплаченный заказ на продукт.
    pub async fn has_access(&self, user_id: i32, product_id: i32) -> Result<bool, AccessError> {
        Ok(db::has_active_order(&self.pool, user_id, product_id).await?)
    }
}
