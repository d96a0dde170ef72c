// src/api/analyses.rs

use actix_web::web::ReqData;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::admin::access_error_response;
use crate::api::portfolio::PORTFOLIO_PRODUCT_SLUG;
use crate::{db, ws, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAnalysisRequest {
    pub title: String,
    pub content: String,
    pub attachment_url: Option<String>,
}

#[get("/analyses")]
pub async fn list_analyses(state: web::Data<AppState>, caller: ReqData<i32>) -> impl Responder {
    let product = match db::get_product_by_slug(&state.pool, PORTFOLIO_PRODUCT_SLUG).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            log::error!("portfolio product {PORTFOLIO_PRODUCT_SLUG} is not configured");
            return HttpResponse::InternalServerError().json(json!({"error": "internal error"}));
        }
        Err(e) => {
            log::error!("list_analyses select product error: {e}");
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
        Err(e) => return access_error_response("list_analyses access check", e),
    }

    match db::list_published_analyses(&state.pool).await {
        Ok(analyses) => HttpResponse::Ok().json(analyses),
        Err(e) => {
            log::error!("list_analyses db error: {e}");
            HttpResponse::InternalServerError().json(json!({"error": "internal error"}))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/analyses",
    tag = "admin",
    request_body = CreateAnalysisRequest,
    responses(
        (status = 200, description = "Analysis published and broadcast to the feed"),
        (status = 400, description = "Empty title or content"),
        (status = 403, description = "Caller is not admin/author")
    )
)]
#[post("/admin/analyses")]
pub async fn create_analysis(
    state: web::Data<AppState>,
    caller: ReqData<i32>,
    payload: web::Json<CreateAnalysisRequest>,
) -> impl Responder {
    match state.access.check_admin_permissions(*caller).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::Forbidden().json(json!({"error": "forbidden"})),
        Err(e) => return access_error_response("create_analysis admin check", e),
    }

    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "title and content are required"}));
    }

    let analysis = match db::insert_analysis(
        &state.pool,
        payload.title.trim(),
        &payload.content,
        payload.attachment_url.as_deref(),
    )
    .await
    {
        Ok(a) => a,
        Err(e) => {
            log::error!("create_analysis db error: {e}");
            return HttpResponse::InternalServerError().json(json!({"error": "internal error"}));
        }
    };

    // Рассылка в ленту best-effort: insert уже состоялся
    ws::notify_analysis(&state.feed_hub, &analysis);

    HttpResponse::Ok().json(analysis)
}
