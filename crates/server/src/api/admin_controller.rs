use crate::{
    api::parse_object_id,
    dtos::{
        admin_dto::{
            AdminStatsDto, AdminUserDto, BlockUserDto, DepositPageDto, DepositQuery, PageQuery, UserPageDto,
            WithdrawalPageDto, WithdrawalQuery,
        },
        deposit_dto::DepositDto,
        withdrawal_dto::{ApproveWithdrawalDto, WithdrawalDto},
    },
    extractors::validation_extractor::ValidationExtractor,
    services::{
        chain::{DynDepositScanner, ScanReport},
        deposit_service::ConfirmOutcome,
        Services,
    },
};
use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::info;
use utils::{AppError, AppResult};

/// 平台统计
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "平台统计", body = AdminStatsDto))
)]
pub async fn stats(Extension(services): Extension<Services>) -> AppResult<Json<AdminStatsDto>> {
    let stats = services.admin.stats().await?;

    Ok(Json(stats.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses((status = 200, description = "用户列表", body = UserPageDto))
)]
pub async fn list_users(
    Extension(services): Extension<Services>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<UserPageDto>> {
    let (page, limit) = (query.page(), query.limit());
    let (users, total) = services.admin.list_users(page, limit).await?;

    Ok(Json(UserPageDto {
        items: users.into_iter().map(AdminUserDto::from).collect(),
        total,
        page,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户ID")),
    responses(
        (status = 200, description = "用户详情", body = AdminUserDto),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<AdminUserDto>> {
    let user = services.admin.get_user(&parse_object_id(&id)?).await?;

    Ok(Json(user.into()))
}

/// 封禁/解封用户
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/block",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "用户ID")),
    request_body = BlockUserDto,
    responses((status = 200, description = "更新后的用户", body = AdminUserDto))
)]
pub async fn block_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<BlockUserDto>,
) -> AppResult<Json<AdminUserDto>> {
    let user = services.admin.set_blocked(&parse_object_id(&id)?, req.blocked).await?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/deposits",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(DepositQuery),
    responses((status = 200, description = "充值列表", body = DepositPageDto))
)]
pub async fn list_deposits(
    Extension(services): Extension<Services>,
    Query(query): Query<DepositQuery>,
) -> AppResult<Json<DepositPageDto>> {
    let paging = query.paging();
    let (page, limit) = (paging.page(), paging.limit());
    let (deposits, total) = services.admin.list_deposits(query.confirmed, page, limit).await?;

    Ok(Json(DepositPageDto {
        items: deposits.into_iter().map(DepositDto::from).collect(),
        total,
        page,
        limit,
    }))
}

/// 人工确认充值(不再校验链上数据)
#[utoipa::path(
    post,
    path = "/api/v1/admin/deposits/{tx_hash}/confirm",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("tx_hash" = String, Path, description = "交易哈希")),
    responses(
        (status = 200, description = "已确认的充值", body = DepositDto),
        (status = 404, description = "充值不存在"),
        (status = 409, description = "充值已确认")
    )
)]
pub async fn confirm_deposit(
    Extension(services): Extension<Services>,
    Path(tx_hash): Path<String>,
) -> AppResult<Json<DepositDto>> {
    match services.deposit.confirm_deposit(&tx_hash).await? {
        ConfirmOutcome::Confirmed { deposit, awards } => {
            info!("🛡️ admin confirmed deposit {} ({} commission(s))", deposit.tx_hash, awards.len());
            Ok(Json(deposit.into()))
        }
        ConfirmOutcome::AlreadyConfirmed(deposit) => Err(AppError::Conflict(format!(
            "Deposit {} is already confirmed.",
            deposit.tx_hash
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/withdrawals",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(WithdrawalQuery),
    responses((status = 200, description = "提现列表", body = WithdrawalPageDto))
)]
pub async fn list_withdrawals(
    Extension(services): Extension<Services>,
    Query(query): Query<WithdrawalQuery>,
) -> AppResult<Json<WithdrawalPageDto>> {
    let paging = query.paging();
    let (page, limit) = (paging.page(), paging.limit());
    let (withdrawals, total) = services.withdrawal.list(query.status, page, limit).await?;

    Ok(Json(WithdrawalPageDto {
        items: withdrawals.into_iter().map(WithdrawalDto::from).collect(),
        total,
        page,
        limit,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/withdrawals/{id}/approve",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "提现ID")),
    request_body = ApproveWithdrawalDto,
    responses(
        (status = 200, description = "已批准", body = WithdrawalDto),
        (status = 409, description = "提现已处理")
    )
)]
pub async fn approve_withdrawal(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<ApproveWithdrawalDto>,
) -> AppResult<Json<WithdrawalDto>> {
    let withdrawal = services.withdrawal.approve(&parse_object_id(&id)?, &req.tx_hash).await?;

    Ok(Json(withdrawal.into()))
}

/// 驳回提现并退回余额
#[utoipa::path(
    post,
    path = "/api/v1/admin/withdrawals/{id}/reject",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "提现ID")),
    responses(
        (status = 200, description = "已驳回", body = WithdrawalDto),
        (status = 409, description = "提现已处理")
    )
)]
pub async fn reject_withdrawal(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<WithdrawalDto>> {
    let withdrawal = services.withdrawal.reject(&parse_object_id(&id)?).await?;

    Ok(Json(withdrawal.into()))
}

/// 立即执行一轮链上充值扫描
#[utoipa::path(
    post,
    path = "/api/v1/admin/poll",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "扫描结果，租约被占用或无新区块时为 null", body = ScanReport),
        (status = 404, description = "当前实例未启用扫描")
    )
)]
pub async fn poll(Extension(scanner): Extension<Option<DynDepositScanner>>) -> AppResult<Json<Option<ScanReport>>> {
    let scanner = scanner.ok_or_else(|| AppError::NotFound("Deposit poller is not enabled on this server.".to_string()))?;

    Ok(Json(scanner.scan_once().await?))
}

pub struct AdminController;
impl AdminController {
    pub fn app() -> Router {
        Router::new()
            .route("/stats", get(stats))
            .route("/users", get(list_users))
            .route("/users/:id", get(get_user))
            .route("/users/:id/block", post(block_user))
            .route("/deposits", get(list_deposits))
            .route("/deposits/:tx_hash/confirm", post(confirm_deposit))
            .route("/withdrawals", get(list_withdrawals))
            .route("/withdrawals/:id/approve", post(approve_withdrawal))
            .route("/withdrawals/:id/reject", post(reject_withdrawal))
            .route("/poll", post(poll))
    }
}
