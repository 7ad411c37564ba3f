use crate::auth::{AuthUser, JwtManager};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use utils::{AppError, AppResult};

/// 从 Authorization 头部提取 Bearer 令牌
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT认证中间件
pub async fn require_auth(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let header = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    let Some(token) = extract_bearer_token(header) else {
        warn!("No authentication token provided");
        return Err(AppError::Unauthorized("Missing bearer token.".to_string()));
    };

    let auth_user = jwt_manager.authenticate(token)?;

    // 将认证用户信息添加到请求扩展中
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// 管理员中间件，需挂在 require_auth 内层
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => Ok(next.run(request).await),
        Some(user) => {
            warn!("🚫 non-admin {} tried to access {}", user.user_id, request.uri().path());
            Err(AppError::Forbidden("Admin role required.".to_string()))
        }
        None => Err(AppError::Unauthorized("Missing bearer token.".to_string())),
    }
}
