////////////////////////////////////////////////////////////////////////
//
// 1. 每个业务一个 Service，通过 Dyn*Repository 访问数据库
// 2. Services 汇总所有 Service，作为 Extension 注入到路由
//
//////////////////////////////////////////////////////////////////////

pub mod admin_service;
pub mod auth_service;
pub mod chain;
pub mod commission_service;
pub mod deposit_service;
pub mod notifier;
pub mod reward_service;
pub mod staking_service;
pub mod user_service;
pub mod withdrawal_service;

#[cfg(test)]
pub(crate) mod test_support;

use crate::auth::JwtManager;
use admin_service::AdminService;
use auth_service::AuthService;
use chain::DynTransactionVerifier;
use commission_service::CommissionService;
use database::{
    commission::repository::DynCommissionRepository, deposit::repository::DynDepositRepository,
    reward::repository::DynRewardRepository, user::repository::DynUserRepository,
    withdrawal::repository::DynWithdrawalRepository, Database,
};
use deposit_service::{DepositService, DynDepositService};
use notifier::{DynNotifier, HttpNotifier};
use reward_service::RewardService;
use staking_service::StakingService;
use std::sync::Arc;
use tracing::info;
use user_service::UserService;
use utils::{Amount, AppConfig, AppResult};
use withdrawal_service::WithdrawalService;

/// 业务参数(从 AppConfig 中提取)
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub min_deposit: Amount,
    pub min_withdrawal: Amount,
    pub withdrawal_fee_bps: u32,
    pub daily_roi_bps: u32,
    pub max_return_bps: u32,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            min_deposit: Amount::from_decimal(config.min_deposit)?,
            min_withdrawal: Amount::from_decimal(config.min_withdrawal)?,
            withdrawal_fee_bps: config.withdrawal_fee_bps,
            daily_roi_bps: config.daily_roi_bps,
            max_return_bps: config.max_return_bps,
        })
    }
}

#[derive(Clone)]
pub struct Repositories {
    pub users: DynUserRepository,
    pub deposits: DynDepositRepository,
    pub commissions: DynCommissionRepository,
    pub withdrawals: DynWithdrawalRepository,
    pub rewards: DynRewardRepository,
}

impl Repositories {
    pub fn from_database(database: Arc<Database>) -> Self {
        Self {
            users: database.clone() as DynUserRepository,
            deposits: database.clone() as DynDepositRepository,
            commissions: database.clone() as DynCommissionRepository,
            withdrawals: database.clone() as DynWithdrawalRepository,
            rewards: database as DynRewardRepository,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub user: Arc<UserService>,
    pub deposit: DynDepositService,
    pub staking: Arc<StakingService>,
    pub reward: Arc<RewardService>,
    pub withdrawal: Arc<WithdrawalService>,
    pub admin: Arc<AdminService>,
    pub jwt: Arc<JwtManager>,
}

impl Services {
    pub fn new(db: Database, config: &AppConfig, verifier: DynTransactionVerifier) -> AppResult<Self> {
        let settings = ServiceSettings::from_config(config)?;
        let repositories = Repositories::from_database(Arc::new(db));
        let notifier = Arc::new(HttpNotifier::from_config(config)) as DynNotifier;
        let jwt = Arc::new(JwtManager::from_config(config));

        info!("🧠 initializing services");

        Ok(Self::with_parts(repositories, settings, jwt, verifier, notifier))
    }

    pub fn with_parts(
        repositories: Repositories,
        settings: ServiceSettings,
        jwt: Arc<JwtManager>,
        verifier: DynTransactionVerifier,
        notifier: DynNotifier,
    ) -> Self {
        let Repositories {
            users,
            deposits,
            commissions,
            withdrawals,
            rewards,
        } = repositories;

        let commission = Arc::new(CommissionService::new(users.clone(), commissions.clone()));
        let deposit = Arc::new(DepositService::new(
            users.clone(),
            deposits.clone(),
            commission,
            verifier,
            notifier.clone(),
            settings.min_deposit,
        )) as DynDepositService;
        let staking = Arc::new(StakingService::new(
            users.clone(),
            notifier.clone(),
            settings.daily_roi_bps,
            settings.max_return_bps,
        ));

        Self {
            auth: Arc::new(AuthService::new(users.clone(), jwt.clone())),
            user: Arc::new(UserService::new(users.clone(), commissions.clone(), staking.clone())),
            deposit,
            staking,
            reward: Arc::new(RewardService::new(users.clone(), rewards.clone(), notifier.clone())),
            withdrawal: Arc::new(WithdrawalService::new(
                users.clone(),
                withdrawals.clone(),
                notifier,
                settings.min_withdrawal,
                settings.withdrawal_fee_bps,
            )),
            admin: Arc::new(AdminService::new(users, deposits, commissions, withdrawals, rewards)),
            jwt,
        }
    }
}
