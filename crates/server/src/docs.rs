use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stakeflow Backend API",
        description = "USDT(BEP-20) 充值、多层推荐佣金、质押收益与奖励档位 API 文档",
        version = "1.0.0"
    ),
    paths(
        // System health check
        crate::api::health,
        // Auth endpoints
        crate::api::auth_controller::register,
        crate::api::auth_controller::login,
        // Deposit endpoints
        crate::api::deposit_controller::submit_deposit,
        crate::api::deposit_controller::check_transaction,
        // User endpoints
        crate::api::user_controller::me,
        crate::api::user_controller::dashboard,
        crate::api::user_controller::team,
        crate::api::user_controller::deposits,
        crate::api::user_controller::commissions,
        // Staking endpoints
        crate::api::staking_controller::summary,
        crate::api::staking_controller::harvest,
        // Reward endpoints
        crate::api::reward_controller::tiers,
        crate::api::reward_controller::claim,
        crate::api::reward_controller::claims,
        // Withdrawal endpoints
        crate::api::withdrawal_controller::request_withdrawal,
        crate::api::withdrawal_controller::list_withdrawals,
        // Admin endpoints
        crate::api::admin_controller::stats,
        crate::api::admin_controller::list_users,
        crate::api::admin_controller::get_user,
        crate::api::admin_controller::block_user,
        crate::api::admin_controller::list_deposits,
        crate::api::admin_controller::confirm_deposit,
        crate::api::admin_controller::list_withdrawals,
        crate::api::admin_controller::approve_withdrawal,
        crate::api::admin_controller::reject_withdrawal,
        crate::api::admin_controller::poll,
    ),
    components(
        schemas(
            crate::dtos::auth_dto::RegisterDto,
            crate::dtos::auth_dto::LoginDto,
            crate::dtos::auth_dto::AuthResponse,
            crate::dtos::user_dto::UserProfileDto,
            crate::dtos::user_dto::BalancesDto,
            crate::dtos::user_dto::DashboardDto,
            crate::dtos::user_dto::TeamMemberDto,
            crate::dtos::user_dto::CommissionDto,
            crate::dtos::deposit_dto::SubmitDepositDto,
            crate::dtos::deposit_dto::CheckTransactionDto,
            crate::dtos::deposit_dto::DepositDto,
            crate::dtos::deposit_dto::DepositResultDto,
            crate::dtos::staking_dto::StakeDto,
            crate::dtos::staking_dto::StakingTotalsDto,
            crate::dtos::staking_dto::StakingSummaryDto,
            crate::dtos::staking_dto::HarvestDto,
            crate::dtos::reward_dto::TierDto,
            crate::dtos::reward_dto::ClaimRewardDto,
            crate::dtos::reward_dto::RewardClaimDto,
            crate::dtos::withdrawal_dto::WithdrawalRequestDto,
            crate::dtos::withdrawal_dto::ApproveWithdrawalDto,
            crate::dtos::withdrawal_dto::WithdrawalDto,
            crate::dtos::admin_dto::BlockUserDto,
            crate::dtos::admin_dto::AdminUserDto,
            crate::dtos::admin_dto::UserPageDto,
            crate::dtos::admin_dto::DepositPageDto,
            crate::dtos::admin_dto::WithdrawalPageDto,
            crate::dtos::admin_dto::TierClaimStatsDto,
            crate::dtos::admin_dto::AdminStatsDto,
            crate::services::chain::ScanReport,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "系统状态", description = "系统健康检查和状态监控"),
        (name = "auth", description = "注册与登录"),
        (name = "deposit", description = "充值上报与链上校验"),
        (name = "user", description = "个人中心与团队"),
        (name = "staking", description = "质押收益"),
        (name = "reward", description = "奖励档位"),
        (name = "withdrawal", description = "提现"),
        (name = "admin", description = "管理后台")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}
