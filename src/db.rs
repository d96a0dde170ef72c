// src/db.rs

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::models::{Analysis, Order, Product, Profile};

fn product_from_row(r: &sqlx::postgres::PgRow) -> Product {
    Product {
        id: r.get("id"),
        slug: r.get("slug"),
        name: r.get("name"),
        price_cents: r.get("price_cents"),
        currency: r.get("currency"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }
}

pub async fn list_active_products(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, slug, name, price_cents, currency, is_active, created_at
           FROM products
           WHERE is_active = true
           ORDER BY price_cents ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(product_from_row).collect())
}

pub async fn get_product_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, slug, name, price_cents, currency, is_active, created_at
           FROM products
           WHERE slug = $1 AND is_active = true"#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(product_from_row))
}

pub async fn get_active_product(pool: &PgPool, product_id: i32) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, slug, name, price_cents, currency, is_active, created_at
           FROM products
           WHERE id = $1 AND is_active = true"#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(product_from_row))
}

pub async fn create_product(
    pool: &PgPool,
    slug: &str,
    name: &str,
    price_cents: i32,
    currency: &str,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO products (slug, name, price_cents, currency, is_active)
           VALUES ($1, $2, $3, $4, true)
           RETURNING id"#,
    )
    .bind(slug)
    .bind(name)
    .bind(price_cents)
    .bind(currency)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<i32>, sqlx::Error> {
    let row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("id")))
}

/// Создаёт пользователя вместе с профилем в одной транзакции.
/// `password_hash = None` для аккаунтов, заведённых вебхуком.
pub async fn create_user_with_profile(
    pool: &PgPool,
    email: &str,
    password_hash: Option<&str>,
    role: &str,
) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"INSERT INTO users (email, password_hash)
           VALUES ($1, $2)
           RETURNING id"#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await?;

    let user_id: i32 = row.get("id");

    sqlx::query("INSERT INTO profiles (user_id, role) VALUES ($1, $2)")
        .bind(user_id)
        .bind(role)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(user_id)
}

pub async fn get_profile(pool: &PgPool, user_id: i32) -> Result<Option<Profile>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT user_id, role, is_active, created_at
           FROM profiles
           WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Profile {
        user_id: r.get("user_id"),
        role: r.get("role"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }))
}

pub async fn insert_order(
    pool: &PgPool,
    user_id: i32,
    product_id: i32,
    price_cents: i32,
    currency: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO orders (user_id, product_id, status, price_cents, currency, expires_at)
           VALUES ($1, $2, 'paid', $3, $4, $5)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(price_cents)
    .bind(currency)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

/// Отменяет все действующие заказы пары (user, product) одним запросом.
/// Возвращает число затронутых строк.
pub async fn cancel_active_orders(
    pool: &PgPool,
    user_id: i32,
    product_id: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE orders
           SET status = 'cancelled', expires_at = NOW()
           WHERE user_id = $1 AND product_id = $2
             AND status = 'paid'
             AND (expires_at IS NULL OR expires_at > NOW())"#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn has_active_order(
    pool: &PgPool,
    user_id: i32,
    product_id: i32,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT EXISTS (
               SELECT 1 FROM orders
               WHERE user_id = $1 AND product_id = $2
                 AND status = 'paid'
                 AND (expires_at IS NULL OR expires_at > NOW())
           ) AS has_access"#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get("has_access"))
}

pub async fn list_user_orders(pool: &PgPool, user_id: i32) -> Result<Vec<Order>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, user_id, product_id, status, price_cents, currency, expires_at, created_at
           FROM orders
           WHERE user_id = $1
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Order {
            id: r.get("id"),
            user_id: r.get("user_id"),
            product_id: r.get("product_id"),
            status: r.get("status"),
            price_cents: r.get("price_cents"),
            currency: r.get("currency"),
            expires_at: r.get("expires_at"),
            created_at: r.get("created_at"),
        })
        .collect())
}

/// Фиксирует внешний event id. `false` — событие уже обработано раньше.
pub async fn record_webhook_event(pool: &PgPool, event_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO webhook_events (event_id)
           VALUES ($1)
           ON CONFLICT (event_id) DO NOTHING"#,
    )
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_analysis(
    pool: &PgPool,
    title: &str,
    content: &str,
    attachment_url: Option<&str>,
) -> Result<Analysis, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO analyses (title, content, attachment_url, is_published)
           VALUES ($1, $2, $3, true)
           RETURNING id, title, content, attachment_url, is_published, created_at"#,
    )
    .bind(title)
    .bind(content)
    .bind(attachment_url)
    .fetch_one(pool)
    .await?;

    Ok(Analysis {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        attachment_url: row.get("attachment_url"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

pub async fn list_published_analyses(pool: &PgPool) -> Result<Vec<Analysis>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, title, content, attachment_url, is_published, created_at
           FROM analyses
           WHERE is_published = true
           ORDER BY created_at DESC, id DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Analysis {
            id: r.get("id"),
            title: r.get("title"),
            content: r.get("content"),
            attachment_url: r.get("attachment_url"),
            is_published: r.get("is_published"),
            created_at: r.get("created_at"),
        })
        .collect())
}
