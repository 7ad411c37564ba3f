use crate::{
    dtos::deposit_dto::{CheckTransactionDto, DepositResultDto, SubmitDepositDto},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{routing::post, Extension, Json, Router};
use utils::AppResult;

/// 上报充值
///
/// 先落库为未确认状态，随后尝试链上校验；校验通过即入账并分佣
#[utoipa::path(
    post,
    path = "/api/v1/deposit",
    tag = "deposit",
    request_body = SubmitDepositDto,
    responses(
        (status = 200, description = "已记录，status 表示确认结果", body = DepositResultDto),
        (status = 400, description = "低于最小充值金额或参数错误"),
        (status = 404, description = "钱包未注册"),
        (status = 409, description = "交易已提交过")
    )
)]
pub async fn submit_deposit(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<SubmitDepositDto>,
) -> AppResult<Json<DepositResultDto>> {
    let receipt = services
        .deposit
        .submit_deposit(&req.wallet_address, req.amount, &req.tx_hash)
        .await?;

    Ok(Json(receipt.into()))
}

/// 按交易哈希查询并确认充值
#[utoipa::path(
    post,
    path = "/api/v1/deposit/check-transaction",
    tag = "deposit",
    request_body = CheckTransactionDto,
    responses(
        (status = 200, description = "校验结果", body = DepositResultDto),
        (status = 404, description = "转出钱包未注册")
    )
)]
pub async fn check_transaction(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<CheckTransactionDto>,
) -> AppResult<Json<DepositResultDto>> {
    let receipt = services.deposit.check_transaction(&req.tx_hash).await?;

    Ok(Json(receipt.into()))
}

pub struct DepositController;
impl DepositController {
    pub fn app() -> Router {
        Router::new()
            .route("/", post(submit_deposit))
            .route("/check-transaction", post(check_transaction))
    }
}
