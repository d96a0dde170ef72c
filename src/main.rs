// src/main.rs
use actix::Actor;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use alphaletter::access::AccessService;
use alphaletter::rate_limit::RateLimit;
use alphaletter::{AppState, api, docs, ws};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Без этих секретов админские ручки и вебхук не работают — падаем сразу
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET required");
    let stripe_webhook_secret =
        env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET required");

    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let redis_client = redis::Client::open(redis_url).expect("invalid REDIS_URL");
    let redis_conn = redis_client
        .get_multiplexed_tokio_connection()
        .await
        .expect("Failed to connect to Redis");

    let rate_limit_per_minute: u32 = env::var("RATE_LIMIT_PER_MINUTE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let feed_hub = ws::FeedHub::new().start();

    let state = web::Data::new(AppState {
        pool: pool.clone(),
        access: AccessService::new(pool),
        feed_hub,
        jwt_secret,
        stripe_webhook_secret,
    });

    let auth_rate_limit = RateLimit::new(redis_conn, rate_limit_per_minute, 60);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Публичные роуты авторизации (с лимитом по IP)
            .service(
                web::scope("/auth")
                    .wrap(auth_rate_limit.clone())
                    .service(api::auth::register)
                    .service(api::auth::login),
            )
            // Защищённые роуты
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::products::list_products)
                    .service(api::products::create_product)
                    .service(api::orders::list_orders)
                    .service(api::portfolio::get_portfolio)
                    .service(api::portfolio::publish_portfolio)
                    .service(api::analyses::list_analyses)
                    .service(api::analyses::create_analysis)
                    .service(api::admin::grant_access)
                    .service(api::admin::revoke_access),
            )
            // Вебхуки (публичные)
            .service(api::webhooks_stripe::stripe_webhook)
            // Лента подписчиков
            .route("/ws/feed", web::get().to(ws::feed_ws))
    })
    .bind(bind_addr)?
    .run()
    .await
}
