// src/models.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Product {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub price_cents: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user_id: i32,
    pub role: String, // admin | author | user
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub status: String, // paid | cancelled
    pub price_cents: i32,
    pub currency: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct Portfolio {
    pub id: i32,
    pub description: String,
    pub json_data: serde_json::Value, // ticker -> weight
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct Analysis {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub attachment_url: Option<String>,
    pub is_published: bool,
    pub created_at: Option<DateTime<Utc>>,
}
