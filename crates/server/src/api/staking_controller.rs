use crate::{
    auth::AuthUser,
    dtos::staking_dto::{HarvestDto, StakingSummaryDto},
    services::Services,
};
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use utils::AppResult;

/// 质押收益进度
#[utoipa::path(
    get,
    path = "/api/v1/staking",
    tag = "staking",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "每笔质押的收益与汇总", body = StakingSummaryDto))
)]
pub async fn summary(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<StakingSummaryDto>> {
    let summary = services.staking.get_summary(&auth.user_id).await?;

    Ok(Json(summary.into()))
}

/// 领取全部可领收益
#[utoipa::path(
    post,
    path = "/api/v1/staking/harvest",
    tag = "staking",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "入账金额", body = HarvestDto),
        (status = 400, description = "暂无可领取收益"),
        (status = 409, description = "并发修改，需重试")
    )
)]
pub async fn harvest(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<HarvestDto>> {
    let credited = services.staking.harvest(&auth.user_id).await?;

    Ok(Json(HarvestDto {
        credited: credited.to_decimal(),
    }))
}

pub struct StakingController;
impl StakingController {
    pub fn app() -> Router {
        Router::new()
            .route("/staking", get(summary))
            .route("/staking/harvest", post(harvest))
    }
}
