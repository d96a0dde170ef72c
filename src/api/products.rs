// src/api/products.rs

use actix_web::web::ReqData;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::admin::access_error_response;
use crate::{db, AppState};

#[get("/products")]
pub async fn list_products(state: web::Data<AppState>) -> impl Responder {
    match db::list_active_products(&state.pool).await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            log::error!("list_products db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub slug: String,
    pub name: String,
    pub price_cents: i32,
    pub currency: String,
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    tag = "admin",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created"),
        (status = 400, description = "Duplicate slug or invalid data"),
        (status = 403, description = "Caller is not admin/author")
    )
)]
#[post("/admin/products")]
pub async fn create_product(
    state: web::Data<AppState>,
    caller: ReqData<i32>,
    payload: web::Json<CreateProductRequest>,
) -> impl Responder {
    match state.access.check_admin_permissions(*caller).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::Forbidden().json(json!({"error": "forbidden"})),
        Err(e) => return access_error_response("create_product admin check", e),
    }

    let slug = payload.slug.trim();
    if slug.is_empty() || payload.price_cents < 0 {
        return HttpResponse::BadRequest().json(json!({"error": "invalid product data"}));
    }

    match db::create_product(&state.pool, slug, &payload.name, payload.price_cents, &payload.currency)
        .await
    {
        Ok(id) => HttpResponse::Ok().json(json!({"success": true, "product_id": id})),
        Err(e) => {
            log::error!("create_product db error: {e}");
            HttpResponse::BadRequest().json(json!({"error": "slug already exists or invalid data"}))
        }
    }
}
