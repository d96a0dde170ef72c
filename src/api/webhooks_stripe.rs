// src/api/webhooks_stripe.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::api::stripe::{verify_signature, StripeEvent};
use crate::{db, AppState};

/// Превращает checkout.session.completed в оплаченный заказ.
///
/// Политика после проверки подписи: любое событие подтверждаем 200,
/// ошибки только логируем — повторная доставка от Stripe не должна
/// плодить побочные эффекты. Повтор того же event id — no-op
/// (дедупликация по webhook_events).
#[utoipa::path(
    post,
    path = "/webhook/stripe",
    tag = "webhooks",
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Bad signature or unparseable body")
    )
)]
#[post("/webhook/stripe")]
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let Some(signature) = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        return HttpResponse::BadRequest().json(json!({"error": "missing signature"}));
    };

    // Плохая подпись — единственный случай, когда отвечаем ошибкой:
    // Stripe может ретраить, состояние не менялось.
    if let Err(e) = verify_signature(&state.stripe_webhook_secret, signature, &body) {
        log::warn!("stripe webhook signature rejected: {e}");
        return HttpResponse::BadRequest().json(json!({"error": "invalid signature"}));
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("stripe webhook body parse error: {e}");
            return HttpResponse::BadRequest().json(json!({"error": "unparseable event"}));
        }
    };

    if event.event_type != "checkout.session.completed" {
        return HttpResponse::Ok().json(json!({"received": true, "ignored": true}));
    }

    // Дедупликация: повторно доставленный event id ничего не делает
    match db::record_webhook_event(&state.pool, &event.id).await {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Ok().json(json!({"received": true, "idempotent": true}));
        }
        Err(e) => {
            log::error!("stripe webhook dedup insert error: {e}");
            return HttpResponse::Ok().json(json!({"received": true}));
        }
    }

    let session = event.data.object;

    // Событие без product_id или email не должно блокировать поток
    let (Some(product_slug), Some(email)) = (
        session
            .metadata
            .as_ref()
            .and_then(|m| m.product_id.as_deref()),
        session
            .customer_details
            .as_ref()
            .and_then(|c| c.email.as_deref()),
    ) else {
        log::warn!(
            "stripe webhook event {} missing product_id or email, skipping",
            event.id
        );
        return HttpResponse::Ok().json(json!({"received": true, "ignored": true}));
    };

    let product = match db::get_product_by_slug(&state.pool, product_slug).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            log::warn!("stripe webhook event {}: unknown product {product_slug}", event.id);
            return HttpResponse::Ok().json(json!({"received": true, "missing_product": true}));
        }
        Err(e) => {
            log::error!("stripe webhook select product error: {e}");
            return HttpResponse::Ok().json(json!({"received": true}));
        }
    };

    let email = email.trim().to_lowercase();

    // Покупатель без аккаунта: заводим пользователя без пароля.
    // Письмо со ссылкой на вход — забота внешнего сервиса, best-effort.
    let user_id = match db::find_user_by_email(&state.pool, &email).await {
        Ok(Some(id)) => id,
        Ok(None) => match db::create_user_with_profile(&state.pool, &email, None, "user").await {
            Ok(id) => {
                log::info!("stripe webhook provisioned user {id} for {email}");
                id
            }
            Err(e) => {
                log::error!("stripe webhook create user error: {e}");
                return HttpResponse::Ok().json(json!({"received": true}));
            }
        },
        Err(e) => {
            log::error!("stripe webhook select user error: {e}");
            return HttpResponse::Ok().json(json!({"received": true}));
        }
    };

    let price_cents = session
        .amount_total
        .map(|a| a as i32)
        .unwrap_or(product.price_cents);
    let currency = session.currency.as_deref().unwrap_or(&product.currency);

    // Оплата через Stripe — бессрочный доступ, expires_at не ставим
    match db::insert_order(&state.pool, user_id, product.id, price_cents, currency, None).await {
        Ok(order_id) => {
            log::info!(
                "stripe webhook event {} -> order {order_id} (user {user_id}, product {})",
                event.id,
                product.slug
            );
        }
        Err(e) => {
            log::error!("stripe webhook insert order error: {e}");
        }
    }

    HttpResponse::Ok().json(json!({"received": true}))
}
