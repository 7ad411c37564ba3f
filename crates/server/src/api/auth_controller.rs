use crate::{
    dtos::auth_dto::{AuthResponse, LoginDto, RegisterDto},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{http::StatusCode, routing::post, Extension, Json, Router};
use utils::AppResult;

/// 注册
///
/// 邀请码可选，填写时必须存在
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "注册成功", body = AuthResponse),
        (status = 400, description = "参数错误或邀请码无效"),
        (status = 409, description = "邮箱或钱包已注册")
    )
)]
pub async fn register(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<RegisterDto>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = services.auth.register(req.into()).await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// 登录
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginDto,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "邮箱或密码错误"),
        (status = 403, description = "账号已封禁")
    )
)]
pub async fn login(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<LoginDto>,
) -> AppResult<Json<AuthResponse>> {
    let session = services.auth.login(&req.email, &req.password).await?;

    Ok(Json(session.into()))
}

pub struct AuthController;
impl AuthController {
    pub fn app() -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
    }
}
