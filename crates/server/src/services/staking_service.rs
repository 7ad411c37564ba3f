use crate::services::notifier::{DynNotifier, BALANCE_UPDATE};
use database::user::{
    model::{Investment, User},
    repository::DynUserRepository,
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use tracing::{info, warn};
use utils::{Amount, AppError, AppResult, BPS_DENOMINATOR};

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const HARVEST_MAX_ATTEMPTS: usize = 3;

/// 单笔质押的收益进度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakePosition {
    pub amount: Amount,
    pub date: i64,
    pub accrued: Amount,
    pub paid_out: Amount,
    pub claimable: Amount,
    /// 已产生收益占收益上限的比例(基点)
    pub progress_bps: u32,
    pub matured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakingSummary {
    pub positions: Vec<StakePosition>,
    pub total_principal: Amount,
    pub total_accrued: Amount,
    pub total_paid_out: Amount,
    pub total_claimable: Amount,
}

/// 按整天计息：每天 `daily_roi_bps`，总收益不超过 `max_return_bps`
pub struct StakingService {
    users: DynUserRepository,
    notifier: DynNotifier,
    daily_roi_bps: u32,
    max_return_bps: u32,
}

impl StakingService {
    pub fn new(users: DynUserRepository, notifier: DynNotifier, daily_roi_bps: u32, max_return_bps: u32) -> Self {
        Self {
            users,
            notifier,
            daily_roi_bps,
            max_return_bps,
        }
    }

    pub fn position(&self, investment: &Investment, now: i64) -> StakePosition {
        let days = ((now - investment.date) / SECONDS_PER_DAY).max(0) as u64;
        let earned_bps = (self.daily_roi_bps as u64 * days).min(self.max_return_bps as u64) as u32;

        let cap = investment.amount.bps(self.max_return_bps);
        let accrued = investment.amount.bps(earned_bps);
        let claimable = accrued.saturating_sub(investment.paid_out);

        let progress_bps = if cap.is_positive() {
            (accrued.micros() as i128 * BPS_DENOMINATOR / cap.micros() as i128) as u32
        } else {
            BPS_DENOMINATOR as u32
        };

        StakePosition {
            amount: investment.amount,
            date: investment.date,
            accrued,
            paid_out: investment.paid_out,
            claimable,
            progress_bps,
            matured: earned_bps >= self.max_return_bps,
        }
    }

    pub fn summarize(&self, user: &User, now: i64) -> StakingSummary {
        let positions: Vec<StakePosition> = user.investments.iter().map(|i| self.position(i, now)).collect();

        StakingSummary {
            total_principal: positions.iter().map(|p| p.amount).sum(),
            total_accrued: positions.iter().map(|p| p.accrued).sum(),
            total_paid_out: positions.iter().map(|p| p.paid_out).sum(),
            total_claimable: positions.iter().map(|p| p.claimable).sum(),
            positions,
        }
    }

    pub async fn get_summary(&self, user_id: &ObjectId) -> AppResult<StakingSummary> {
        let user = self.load_user(user_id).await?;

        Ok(self.summarize(&user, chrono::Utc::now().timestamp()))
    }

    /// 领取全部可领收益到 wallet
    ///
    /// 读改写基于 version 乐观锁，冲突时重读重试。
    pub async fn harvest(&self, user_id: &ObjectId) -> AppResult<Amount> {
        for attempt in 1..=HARVEST_MAX_ATTEMPTS {
            let user = self.load_user(user_id).await?;
            if user.is_blocked {
                return Err(AppError::Forbidden("Account is blocked.".to_string()));
            }

            let now = chrono::Utc::now().timestamp();
            let mut credited = Amount::ZERO;
            let investments: Vec<Investment> = user
                .investments
                .iter()
                .map(|investment| {
                    let position = self.position(investment, now);
                    credited += position.claimable;
                    Investment {
                        paid_out: investment.paid_out + position.claimable,
                        ..investment.clone()
                    }
                })
                .collect();

            if !credited.is_positive() {
                return Err(AppError::BadRequest("Nothing to harvest yet.".to_string()));
            }

            if self
                .users
                .replace_investments(&user.id, user.version, investments, credited)
                .await?
            {
                info!("🌾 user {} harvested {} USDT", user.id, credited);
                self.notifier
                    .emit(
                        BALANCE_UPDATE,
                        Some(&user.wallet_address),
                        json!({ "reason": "harvest", "amount": credited.to_decimal() }),
                    )
                    .await;
                return Ok(credited);
            }

            warn!("🔄 harvest version conflict for {} (attempt {})", user.id, attempt);
        }

        Err(AppError::Conflict(
            "Balance changed while harvesting, please retry.".to_string(),
        ))
    }

    async fn load_user(&self, user_id: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))
    }
}
