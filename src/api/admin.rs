// src/api/admin.rs

use actix_web::web::ReqData;
use actix_web::{post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::access::AccessError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantAccessRequest {
    pub user_id: i32,
    pub product_id: i32,
    pub duration_days: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeAccessRequest {
    pub user_id: i32,
    pub product_id: i32,
}

/// Общий маппинг ошибок сервиса в HTTP. Детали — только в лог.
pub fn access_error_response(context: &str, e: AccessError) -> HttpResponse {
    match e {
        AccessError::PermissionDenied => {
            HttpResponse::Forbidden().json(json!({"error": "forbidden"}))
        }
        AccessError::NotFound => HttpResponse::NotFound().json(json!({"error": "not found"})),
        AccessError::Validation(msg) => HttpResponse::BadRequest().json(json!({"error": msg})),
        AccessError::Db(e) => {
            log::error!("{context}: {e}");
            HttpResponse::InternalServerError().json(json!({"error": "internal error"}))
        }
    }
}

/// Проверка роли до любой мутации: отказ в роли — 403, сбой БД — 500.
async fn require_admin(state: &AppState, user_id: i32) -> Result<(), AccessError> {
    if state.access.check_admin_permissions(user_id).await? {
        Ok(())
    } else {
        Err(AccessError::PermissionDenied)
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/access/grant",
    tag = "admin",
    request_body = GrantAccessRequest,
    responses(
        (status = 200, description = "Access granted"),
        (status = 400, description = "Invalid duration"),
        (status = 403, description = "Caller is not admin/author"),
        (status = 404, description = "Unknown or inactive product")
    )
)]
#[post("/admin/access/grant")]
pub async fn grant_access(
    state: web::Data<AppState>,
    caller: ReqData<i32>,
    payload: web::Json<GrantAccessRequest>,
) -> impl Responder {
    if let Err(e) = require_admin(&state, *caller).await {
        return access_error_response("grant_access admin check", e);
    }

    match state
        .access
        .grant_access(payload.user_id, payload.product_id, payload.duration_days)
        .await
    {
        Ok(order_id) => HttpResponse::Ok().json(json!({"success": true, "order_id": order_id})),
        Err(e) => access_error_response("grant_access", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/access/revoke",
    tag = "admin",
    request_body = RevokeAccessRequest,
    responses(
        (status = 200, description = "All active grants revoked"),
        (status = 403, description = "Caller is not admin/author"),
        (status = 404, description = "No active grants to revoke")
    )
)]
#[post("/admin/access/revoke")]
pub async fn revoke_access(
    state: web::Data<AppState>,
    caller: ReqData<i32>,
    payload: web::Json<RevokeAccessRequest>,
) -> impl Responder {
    if let Err(e) = require_admin(&state, *caller).await {
        return access_error_response("revoke_access admin check", e);
    }

    match state
        .access
        .revoke_access(payload.user_id, payload.product_id)
        .await
    {
        Ok(revoked) => HttpResponse::Ok().json(json!({"success": true, "revoked": revoked})),
        Err(e) => access_error_response("revoke_access", e),
    }
}
