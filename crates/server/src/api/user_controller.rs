use crate::{
    auth::AuthUser,
    dtos::{
        deposit_dto::DepositDto,
        user_dto::{CommissionDto, DashboardDto, TeamMemberDto, UserProfileDto},
    },
    services::Services,
};
use axum::{routing::get, Extension, Json, Router};
use utils::AppResult;

/// 当前用户信息
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "user",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "当前用户", body = UserProfileDto))
)]
pub async fn me(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<UserProfileDto>> {
    let user = services.user.get_user(&auth.user_id).await?;

    Ok(Json(user.into()))
}

/// 个人中心：余额、团队、等级、质押汇总与下一档位
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "user",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "个人中心数据", body = DashboardDto))
)]
pub async fn dashboard(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<DashboardDto>> {
    let dashboard = services.user.dashboard(&auth.user_id).await?;

    Ok(Json(dashboard.into()))
}

/// 直推成员
#[utoipa::path(
    get,
    path = "/api/v1/team",
    tag = "user",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "直推成员列表", body = Vec<TeamMemberDto>))
)]
pub async fn team(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<TeamMemberDto>>> {
    let members = services.user.team(&auth.user_id).await?;

    Ok(Json(members.into_iter().map(TeamMemberDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/deposits",
    tag = "user",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "充值记录", body = Vec<DepositDto>))
)]
pub async fn deposits(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<DepositDto>>> {
    let deposits = services.deposit.list_user_deposits(&auth.user_id).await?;

    Ok(Json(deposits.into_iter().map(DepositDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/commissions",
    tag = "user",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "佣金流水", body = Vec<CommissionDto>))
)]
pub async fn commissions(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<CommissionDto>>> {
    let commissions = services.user.commissions(&auth.user_id).await?;

    Ok(Json(commissions.into_iter().map(CommissionDto::from).collect()))
}

pub struct UserController;
impl UserController {
    pub fn app() -> Router {
        Router::new()
            .route("/me", get(me))
            .route("/dashboard", get(dashboard))
            .route("/team", get(team))
            .route("/deposits", get(deposits))
            .route("/commissions", get(commissions))
    }
}
