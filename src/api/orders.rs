// src/api/orders.rs

use actix_web::web::ReqData;
use actix_web::{get, web, HttpResponse, Responder};

use crate::{db, AppState};

/// Покупки текущего пользователя, свежие первыми.
#[get("/orders")]
pub async fn list_orders(state: web::Data<AppState>, caller: ReqData<i32>) -> impl Responder {
    match db::list_user_orders(&state.pool, *caller).await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => {
            log::error!("list_orders db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
