// src/portfolio.rs

use std::collections::BTreeMap;

use sqlx::{PgPool, Row};

use crate::access::AccessError;
use crate::models::Portfolio;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Проверяет карту весов: каждый вес в [0,1], сумма равна 1.0.
pub fn validate_weights(weights: &BTreeMap<String, f64>) -> Result<(), AccessError> {
    if weights.is_empty() {
        return Err(AccessError::Validation("weights must not be empty".to_string()));
    }

    for (ticker, weight) in weights {
        if ticker.trim().is_empty() {
            return Err(AccessError::Validation("ticker must not be empty".to_string()));
        }
        if !weight.is_finite() || *weight < 0.0 || *weight > 1.0 {
            return Err(AccessError::Validation(format!(
                "weight for {ticker} must be within [0, 1]"
            )));
        }
    }

    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(AccessError::Validation(format!(
            "weights must sum to 1.0, got {sum}"
        )));
    }

    Ok(())
}

/// Публикует новый снимок портфеля: в одной транзакции снимает флаг
/// с текущего активного и вставляет новый активным.
pub async fn publish(
    pool: &PgPool,
    description: &str,
    weights: &BTreeMap<String, f64>,
) -> Result<Portfolio, AccessError> {
    validate_weights(weights)?;

    let json_data = serde_json::to_value(weights)
        .map_err(|e| AccessError::Validation(format!("weights are not serializable: {e}")))?;

    let mut tx = pool.begin().await.map_err(AccessError::Db)?;

    sqlx::query("UPDATE portfolios SET is_active = false WHERE is_active = true")
        .execute(&mut *tx)
        .await
        .map_err(AccessError::Db)?;

    let row = sqlx::query(
        r#"INSERT INTO portfolios (description, json_data, is_active)
           VALUES ($1, $2, true)
           RETURNING id, description, json_data, is_active, created_at"#,
    )
    .bind(description)
    .bind(&json_data)
    .fetch_one(&mut *tx)
    .await
    .map_err(AccessError::Db)?;

    tx.commit().await.map_err(AccessError::Db)?;

    Ok(Portfolio {
        id: row.get("id"),
        description: row.get("description"),
        json_data: row.get("json_data"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    })
}

pub async fn active_portfolio(pool: &PgPool) -> Result<Option<Portfolio>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, description, json_data, is_active, created_at
           FROM portfolios
           WHERE is_active = true
           ORDER BY created_at DESC, id DESC
           LIMIT 1"#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Portfolio {
        id: r.get("id"),
        description: r.get("description"),
        json_data: r.get("json_data"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }))
}
