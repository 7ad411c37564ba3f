use crate::{
    auth::AuthUser,
    dtos::withdrawal_dto::{WithdrawalDto, WithdrawalRequestDto},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use utils::AppResult;

/// 申请提现
///
/// 申请时即扣除余额，手续费从提现金额中扣除
#[utoipa::path(
    post,
    path = "/api/v1/withdrawals",
    tag = "withdrawal",
    security(("bearer_auth" = [])),
    request_body = WithdrawalRequestDto,
    responses(
        (status = 201, description = "已创建待审核的提现", body = WithdrawalDto),
        (status = 400, description = "低于最小提现金额或余额不足")
    )
)]
pub async fn request_withdrawal(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    ValidationExtractor(req): ValidationExtractor<WithdrawalRequestDto>,
) -> AppResult<(StatusCode, Json<WithdrawalDto>)> {
    let withdrawal = services.withdrawal.request_withdrawal(&auth.user_id, req.amount).await?;

    Ok((StatusCode::CREATED, Json(withdrawal.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/withdrawals",
    tag = "withdrawal",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "提现记录", body = Vec<WithdrawalDto>))
)]
pub async fn list_withdrawals(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<WithdrawalDto>>> {
    let withdrawals = services.withdrawal.list_by_user(&auth.user_id).await?;

    Ok(Json(withdrawals.into_iter().map(WithdrawalDto::from).collect()))
}

pub struct WithdrawalController;
impl WithdrawalController {
    pub fn app() -> Router {
        Router::new().route("/withdrawals", get(list_withdrawals).post(request_withdrawal))
    }
}
