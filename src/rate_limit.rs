// src/rate_limit.rs
//
// Счётчики запросов в Redis (INCR + EXPIRE, фиксированное окно),
// общие для всех инстансов процесса. Ключ — IP клиента.

use std::fmt;
use std::task::{Context, Poll};

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse, ResponseError};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

#[derive(Debug)]
struct RateLimited {
    retry_after_secs: i64,
}

impl fmt::Display for RateLimited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limit exceeded")
    }
}

impl ResponseError for RateLimited {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .insert_header(("Retry-After", self.retry_after_secs.to_string()))
            .json(serde_json::json!({"error": "rate limit exceeded"}))
    }
}

#[derive(Clone)]
pub struct RateLimit {
    conn: MultiplexedConnection,
    limit: u32,
    window_secs: i64,
}

impl RateLimit {
    pub fn new(conn: MultiplexedConnection, limit: u32, window_secs: i64) -> Self {
        Self {
            conn,
            limit,
            window_secs,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitInner {
            service,
            conn: self.conn.clone(),
            limit: self.limit,
            window_secs: self.window_secs,
        }))
    }
}

pub struct RateLimitInner<S> {
    service: S,
    conn: MultiplexedConnection,
    limit: u32,
    window_secs: i64,
}

impl<S, B> Service<ServiceRequest> for RateLimitInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        let mut conn = self.conn.clone();
        let limit = self.limit;
        let window_secs = self.window_secs;
        let fut = self.service.call(req);

        Box::pin(async move {
            let key = format!("ratelimit:auth:{client_ip}");

            // INCR + EXPIRE на первом запросе окна. При недоступном Redis
            // пропускаем запрос, только пишем warning (fail open).
            let count: Result<i64, redis::RedisError> = conn.incr(&key, 1_i64).await;

            match count {
                Ok(1) => {
                    if let Err(e) = conn.expire::<_, ()>(&key, window_secs).await {
                        log::warn!("rate limit expire error: {e}");
                    }
                }
                Ok(count) if count > limit as i64 => {
                    let ttl: i64 = conn.ttl(&key).await.unwrap_or(window_secs);
                    let retry_after_secs = if ttl > 0 { ttl } else { window_secs };
                    return Err(RateLimited { retry_after_secs }.into());
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("rate limit unavailable: {e}");
                }
            }

            fut.await
        })
    }
}
