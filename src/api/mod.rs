pub mod admin;
pub mod analyses;
pub mod auth;
pub mod orders;
pub mod portfolio;
pub mod products;
pub mod stripe;
pub mod webhooks_stripe;
