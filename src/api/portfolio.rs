// src/api/portfolio.rs

use std::collections::BTreeMap;

use actix_web::web::ReqData;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::admin::access_error_response;
use crate::{db, portfolio, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishPortfolioRequest {
    pub description: String,
    /// ticker -> вес, веса в сумме дают 1.0
    pub weights: BTreeMap<String, f64>,
}

/// Продукт, которым закрыт портфель. Slug стабилен, id может меняться между стендами.
pub const PORTFOLIO_PRODUCT_SLUG: &str = "author-portfolio";

#[utoipa::path(
    get,
    path = "/api/portfolio",
    tag = "portfolio",
    responses(
        (status = 200, description = "Active portfolio snapshot"),
        (status = 403, description = "Caller has no active subscription"),
        (status = 404, description = "No portfolio published yet")
    )
)]
#[get("/portfolio")]
pub async fn get_portfolio(state: web::Data<AppState>, caller: ReqData<i32>) -> impl Responder {
    // Гейт по продукту портфеля: без действующего заказа отдаём
    // приглашение к покупке, не контент.
    let product = match db::get_product_by_slug(&state.pool, PORTFOLIO_PRODUCT_SLUG).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            log::error!("portfolio product {PORTFOLIO_PRODUCT_SLUG} is not configured");
            return HttpResponse::InternalServerError().json(json!({"error": "internal error"}));
        }
        Err(e) => {
            log::error!("get_portfolio select product error: {e}");
            return HttpResponse::InternalServerError().json(json!({"error": "internal error"}));
        }
    };

    match state.access.has_access(*caller, product.id).await {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Forbidden().json(json!({
                "error": "subscription required",
                "product_slug": product.slug
            }));
        }
        Err(e) => return access_error_response("get_portfolio access check", e),
    }

    match portfolio::active_portfolio(&state.pool).await {
        Ok(Some(p)) => HttpResponse::Ok().json(p),
        Ok(None) => HttpResponse::NotFound().json(json!({"error": "no active portfolio"})),
        Err(e) => {
            log::error!("get_portfolio db error: {e}");
            HttpResponse::InternalServerError().json(json!({"error": "internal error"}))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/portfolio",
    tag = "admin",
    request_body = PublishPortfolioRequest,
    responses(
        (status = 200, description = "Portfolio published"),
        (status = 400, description = "Weights failed validation"),
        (status = 403, description = "Caller is not admin/author")
    )
)]
#[post("/admin/portfolio")]
pub async fn publish_portfolio(
    state: web::Data<AppState>,
    caller: ReqData<i32>,
    payload: web::Json<PublishPortfolioRequest>,
) -> impl Responder {
    match state.access.check_admin_permissions(*caller).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::Forbidden().json(json!({"error": "forbidden"})),
        Err(e) => return access_error_response("publish_portfolio admin check", e),
    }

    match portfolio::publish(&state.pool, &payload.description, &payload.weights).await {
        Ok(p) => HttpResponse::Ok().json(p),
        Err(e) => access_error_response("publish_portfolio", e),
    }
}
