use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::admin::grant_access,
        crate::api::admin::revoke_access,
        crate::api::products::create_product,
        crate::api::portfolio::get_portfolio,
        crate::api::portfolio::publish_portfolio,
        crate::api::analyses::create_analysis,
        crate::api::webhooks_stripe::stripe_webhook
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::admin::GrantAccessRequest,
            crate::api::admin::RevokeAccessRequest,
            crate::api::products::CreateProductRequest,
            crate::api::portfolio::PublishPortfolioRequest,
            crate::api::analyses::CreateAnalysisRequest
        )
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "admin", description = "Admin: products, grants, publications"),
        (name = "portfolio", description = "Author portfolio"),
        (name = "webhooks", description = "Callbacks from Stripe")
    )
)]
pub struct ApiDoc;
