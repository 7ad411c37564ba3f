pub mod admin_controller;
pub mod auth_controller;
pub mod deposit_controller;
pub mod reward_controller;
pub mod staking_controller;
pub mod user_controller;
pub mod withdrawal_controller;

use crate::auth::{require_admin, require_auth, JwtManager};
use axum::{
    middleware,
    routing::{get, Router},
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use utils::{AppError, AppResult};

/// 系统健康检查
///
/// 返回服务器运行状态
#[utoipa::path(
    get,
    path = "/api/v1/",
    responses(
        (status = 200, description = "服务器运行正常", body = String)
    ),
    tag = "系统状态"
)]
pub async fn health() -> &'static str {
    "Server is running! 🚀"
}

pub(crate) fn parse_object_id(id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", id)))
}

pub fn app(jwt: Arc<JwtManager>) -> Router {
    let admin = admin_controller::AdminController::app().layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .merge(user_controller::UserController::app())
        .merge(staking_controller::StakingController::app())
        .merge(reward_controller::RewardController::app())
        .merge(withdrawal_controller::WithdrawalController::app())
        .nest("/admin", admin)
        .layer(middleware::from_fn_with_state(jwt, require_auth));

    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_controller::AuthController::app())
        .nest("/deposit", deposit_controller::DepositController::app())
        .merge(protected)
}
