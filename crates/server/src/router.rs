use crate::{api, docs::ApiDoc, middleware, services::chain::DynDepositScanner, services::Services};
use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    BoxError, Extension, Json, Router,
};
use lazy_static::lazy_static;
use serde_json::json;
use std::time::Duration;
use tower::{buffer::BufferLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

lazy_static! {
    static ref HTTP_TIMEOUT: u64 = 30;
}

pub struct AppRouter;

impl AppRouter {
    pub fn new(services: Services, scanner: Option<DynDepositScanner>, client_url: Option<&str>) -> Router {
        let cors = Self::cors(client_url);
        let jwt = services.jwt.clone();

        Router::new()
            // API 路由
            .nest("/api/v1", api::app(jwt))
            .layer(axum_middleware::from_fn(middleware::request_logger))
            .layer(cors)
            .layer(
                ServiceBuilder::new()
                    .layer(Extension(services))
                    .layer(Extension(scanner))
                    .layer(TraceLayer::new_for_http())
                    .layer(HandleErrorLayer::new(Self::handle_timeout_error))
                    .timeout(Duration::from_secs(*HTTP_TIMEOUT))
                    .layer(BufferLayer::new(1024)),
            )
            // Swagger UI 路由 - 包含 OpenAPI JSON 端点
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .fallback(Self::handle_404)
    }

    /// 配置了 CLIENT_URL 时只允许该来源
    fn cors(client_url: Option<&str>) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::DELETE,
                Method::PUT,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

        match client_url.map(HeaderValue::from_str) {
            Some(Ok(origin)) => cors.allow_origin(origin),
            Some(Err(e)) => {
                warn!("⚠️ invalid CLIENT_URL ({}), allowing any origin", e);
                cors.allow_origin(Any)
            }
            None => cors.allow_origin(Any),
        }
    }

    async fn handle_404() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "errors": {
                    "message": vec![String::from("The requested resource does not exist on this server!")],
                }
            })),
        )
    }

    async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
        if err.is::<tower::timeout::error::Elapsed>() {
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({
                    "errors": {
                        "message": vec![format!(
                            "Request took longer than the configured {} second timeout",
                            *HTTP_TIMEOUT
                        )],
                    }
                })),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errors": {
                        "message": vec![format!("Unhandled internal error: {}", err)],
                    }
                })),
            )
        }
    }
}
