use actix_web::test::TestRequest;
use actix_web::{App, test, web};
use serde_json::json;
use sqlx::Row;
use uuid::Uuid;

use alphaletter::access::AccessService;
use alphaletter::api;

mod support;

#[actix_web::test]
async fn admin_publishes_and_subscriber_reads_feed() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let suffix = Uuid::new_v4().to_string();

    let product_id: i32 = sqlx::query(
        r#"INSERT INTO products (slug, name, price_cents, currency, is_active)
           VALUES ($1, 'Author Portfolio', 4900, 'usd', true)
           RETURNING id"#,
    )
    .bind(api::portfolio::PORTFOLIO_PRODUCT_SLUG)
    .fetch_one(pool)
    .await
    .expect("insert product")
    .get("id");

    let state = web::Data::new(support::build_state(test_db.pool.clone(), "whsec_test"));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/auth").service(api::auth::register))
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::analyses::list_analyses)
                    .service(api::analyses::create_analysis),
            ),
    )
    .await;

    let author: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"email": format!("author_{suffix}@example.com"), "password": "secret123"}))
            .to_request(),
    )
    .await;
    let author_token = author["token"].as_str().expect("token").to_string();
    let author_id = author["user_id"].as_i64().expect("user_id") as i32;

    sqlx::query("UPDATE profiles SET role = 'author' WHERE user_id = $1")
        .bind(author_id)
        .execute(pool)
        .await
        .expect("promote author");

    for title in ["Q1 letter", "Q2 letter"] {
        let resp = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/admin/analyses")
                .insert_header(("Authorization", format!("Bearer {author_token}")))
                .set_json(json!({"title": title, "content": "full text"}))
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
    }

    let reader: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"email": format!("reader_{suffix}@example.com"), "password": "secret123"}))
            .to_request(),
    )
    .await;
    let reader_token = reader["token"].as_str().expect("token").to_string();
    let reader_id = reader["user_id"].as_i64().expect("user_id") as i32;

    // без подписки лента закрыта
    let gated = test::call_service(
        &app,
        TestRequest::get()
            .uri("/api/analyses")
            .insert_header(("Authorization", format!("Bearer {reader_token}")))
            .to_request(),
    )
    .await;
    assert_eq!(gated.status(), 403);

    AccessService::new(pool.clone())
        .grant_access(reader_id, product_id, 30)
        .await
        .expect("grant");

    let feed: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri("/api/analyses")
            .insert_header(("Authorization", format!("Bearer {reader_token}")))
            .to_request(),
    )
    .await;

    let items = feed.as_array().expect("array");
    assert_eq!(items.len(), 2);
    // свежие публикации первыми
    assert_eq!(items[0]["title"], "Q2 letter");
    assert_eq!(items[1]["title"], "Q1 letter");
}

#[actix_web::test]
async fn plain_user_cannot_publish_analysis() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let suffix = Uuid::new_v4().to_string();

    let state = web::Data::new(support::build_state(test_db.pool.clone(), "whsec_test"));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/auth").service(api::auth::register))
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::analyses::create_analysis),
            ),
    )
    .await;

    let reader: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"email": format!("reader_{suffix}@example.com"), "password": "secret123"}))
            .to_request(),
    )
    .await;
    let token = reader["token"].as_str().expect("token").to_string();

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/admin/analyses")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"title": "not yours", "content": "text"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);

    let rows: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM analyses")
        .fetch_one(pool)
        .await
        .expect("count analyses")
        .get("cnt");
    assert_eq!(rows, 0);
}
