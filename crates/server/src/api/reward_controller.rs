use crate::{
    auth::AuthUser,
    dtos::reward_dto::{ClaimRewardDto, RewardClaimDto, TierDto},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use utils::AppResult;

/// 奖励档位及领取状态
#[utoipa::path(
    get,
    path = "/api/v1/rewards/tiers",
    tag = "reward",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "全部档位", body = Vec<TierDto>))
)]
pub async fn tiers(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<TierDto>>> {
    let tiers = services.reward.get_tiers(&auth.user_id).await?;

    Ok(Json(tiers.into_iter().map(TierDto::from).collect()))
}

/// 领取档位奖励，每个档位只能领取一次
#[utoipa::path(
    post,
    path = "/api/v1/rewards/claim",
    tag = "reward",
    security(("bearer_auth" = [])),
    request_body = ClaimRewardDto,
    responses(
        (status = 200, description = "领取成功", body = RewardClaimDto),
        (status = 400, description = "未达到档位条件"),
        (status = 409, description = "已领取")
    )
)]
pub async fn claim(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    ValidationExtractor(req): ValidationExtractor<ClaimRewardDto>,
) -> AppResult<Json<RewardClaimDto>> {
    let claim = services.reward.claim_reward(&auth.user_id, req.tier).await?;

    Ok(Json(claim.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/rewards/claims",
    tag = "reward",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "领取记录", body = Vec<RewardClaimDto>))
)]
pub async fn claims(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<RewardClaimDto>>> {
    let claims = services.reward.list_claims(&auth.user_id).await?;

    Ok(Json(claims.into_iter().map(RewardClaimDto::from).collect()))
}

pub struct RewardController;
impl RewardController {
    pub fn app() -> Router {
        Router::new()
            .route("/rewards/tiers", get(tiers))
            .route("/rewards/claim", post(claim))
            .route("/rewards/claims", get(claims))
    }
}
