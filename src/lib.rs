pub mod access;
pub mod api;
pub mod db;
pub mod docs;
pub mod models;
pub mod portfolio;
pub mod rate_limit;
pub mod ws;

use sqlx::PgPool;

use crate::access::AccessService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub access: AccessService,
    pub feed_hub: actix::Addr<ws::FeedHub>,
    pub jwt_secret: String,
    pub stripe_webhook_secret: String,
}
