use crate::services::{
    reward_service::{next_tier, RewardTier},
    staking_service::{StakingService, StakingSummary},
};
use database::{
    commission::{model::Commission, repository::DynCommissionRepository},
    user::{model::User, repository::DynUserRepository},
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use utils::{AppError, AppResult};

/// 个人中心聚合数据
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub user: User,
    pub staking: StakingSummary,
    pub next_tier: Option<RewardTier>,
}

pub struct UserService {
    users: DynUserRepository,
    commissions: DynCommissionRepository,
    staking: Arc<StakingService>,
}

impl UserService {
    pub fn new(users: DynUserRepository, commissions: DynCommissionRepository, staking: Arc<StakingService>) -> Self {
        Self {
            users,
            commissions,
            staking,
        }
    }

    pub async fn get_user(&self, user_id: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))
    }

    pub async fn dashboard(&self, user_id: &ObjectId) -> AppResult<Dashboard> {
        let user = self.get_user(user_id).await?;
        let staking = self.staking.summarize(&user, chrono::Utc::now().timestamp());
        let next_tier = next_tier(user.level).copied();

        Ok(Dashboard {
            user,
            staking,
            next_tier,
        })
    }

    /// 直推成员
    pub async fn team(&self, user_id: &ObjectId) -> AppResult<Vec<User>> {
        self.users.list_directs(user_id).await
    }

    pub async fn commissions(&self, user_id: &ObjectId) -> AppResult<Vec<Commission>> {
        self.commissions.list_commissions_by_beneficiary(user_id).await
    }
}
