use crate::services::{
    notifier::{Notification, BALANCE_UPDATE, LEVEL_UPDATE},
    reward_service::qualified_level,
};
use database::{
    commission::{model::Commission, repository::DynCommissionRepository},
    deposit::model::Deposit,
    user::{
        model::{commission_key, User},
        repository::DynUserRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, warn};
use utils::{Amount, AppResult};

/// 各层佣金比例(基点)：12%、5%、2%、2%
pub const COMMISSION_RATES_BPS: [u32; 4] = [1200, 500, 200, 200];

/// 一次入账的佣金
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionAward {
    pub beneficiary_id: ObjectId,
    pub level: u32,
    pub rate_bps: u32,
    pub amount: Amount,
}

/// 一次分佣的结果：入账明细与待推送事件
#[derive(Debug, Default)]
pub struct Distribution {
    pub awards: Vec<CommissionAward>,
    pub notifications: Vec<Notification>,
}

/// 佣金分配
///
/// 从充值用户沿 `referred_by` 向上最多走 4 层。每层以 `"{depositor}:{level}"`
/// 做去重键，同一对 (充值用户, 层级) 对同一上级只入账一次。
pub struct CommissionService {
    users: DynUserRepository,
    commissions: DynCommissionRepository,
}

impl CommissionService {
    pub fn new(users: DynUserRepository, commissions: DynCommissionRepository) -> Self {
        Self { users, commissions }
    }

    /// 可重复执行：入账、流水与直推业绩都以键去重，中断后再次调用只补齐缺失的部分
    pub async fn distribute(&self, depositor: &User, deposit: &Deposit) -> AppResult<Distribution> {
        let mut distribution = Distribution::default();
        let mut visited = HashSet::from([depositor.id]);
        let mut upper = depositor.referred_by;

        for (index, rate_bps) in COMMISSION_RATES_BPS.iter().copied().enumerate() {
            let level = index as u32 + 1;

            let Some(referrer_id) = upper else {
                break;
            };

            // 推荐链成环时停止
            if !visited.insert(referrer_id) {
                warn!(
                    "🔁 referral cycle detected at level {} for depositor {}, stop walking",
                    level, depositor.id
                );
                break;
            }

            let Some(referrer) = self.users.get_user(&referrer_id).await? else {
                warn!("⚠️ referrer {} of level {} not found, stop walking", referrer_id, level);
                break;
            };

            self.pay_level(&mut distribution, depositor, &referrer, deposit, level, rate_bps)
                .await?;

            if level == 1 {
                self.refresh_direct_stats(&mut distribution, &referrer, deposit).await?;
            }

            upper = referrer.referred_by;
        }

        Ok(distribution)
    }

    async fn pay_level(
        &self,
        distribution: &mut Distribution,
        depositor: &User,
        referrer: &User,
        deposit: &Deposit,
        level: u32,
        rate_bps: u32,
    ) -> AppResult<()> {
        let amount = deposit.amount.bps(rate_bps);
        if !amount.is_positive() {
            return Ok(());
        }

        let key = commission_key(&depositor.id, level);
        let credited = self.users.credit_commission(&referrer.id, &key, amount).await?;

        // 键已存在时流水也应存在；上次在入账与写流水之间中断时这里补写
        let recorded = self
            .commissions
            .create_commission(Commission {
                id: ObjectId::new(),
                beneficiary_id: referrer.id,
                depositor_id: depositor.id,
                tx_hash: deposit.tx_hash.clone(),
                level,
                rate_bps,
                amount,
                created_at: chrono::Utc::now().timestamp(),
            })
            .await?;

        if !credited {
            if recorded {
                warn!("🩹 restored missing commission record {} for {}", key, referrer.id);
            }
            info!("⏭️ level {} commission {} already paid to {}", level, key, referrer.id);
            return Ok(());
        }

        info!(
            "💸 level {} commission {} USDT credited to {} (deposit {})",
            level, amount, referrer.id, deposit.tx_hash
        );

        distribution.notifications.push(Notification::to_wallet(
            BALANCE_UPDATE,
            &referrer.wallet_address,
            json!({
                "reason": "commission",
                "level": level,
                "amount": amount.to_decimal(),
                "from": depositor.wallet_address,
            }),
        ));

        distribution.awards.push(CommissionAward {
            beneficiary_id: referrer.id,
            level,
            rate_bps,
            amount,
        });

        Ok(())
    }

    /// 直推业绩、团队人数与等级只在第一层更新
    async fn refresh_direct_stats(
        &self,
        distribution: &mut Distribution,
        referrer: &User,
        deposit: &Deposit,
    ) -> AppResult<()> {
        if !self
            .users
            .add_direct_business(&referrer.id, &deposit.tx_hash, deposit.amount)
            .await?
        {
            info!("⏭️ deposit {} already counted in direct business of {}", deposit.tx_hash, referrer.id);
        }

        let total_team = self.users.count_directs(&referrer.id).await?;
        let active_users = self.users.count_active_directs(&referrer.id).await?;

        let Some(fresh) = self.users.get_user(&referrer.id).await? else {
            return Ok(());
        };
        let level = qualified_level(fresh.direct_business, active_users);

        self.users
            .update_team_stats(&referrer.id, total_team, active_users, level)
            .await?;

        if level != fresh.level {
            info!("🏅 user {} level {} -> {}", referrer.id, fresh.level, level);
            distribution.notifications.push(Notification::to_wallet(
                LEVEL_UPDATE,
                &referrer.wallet_address,
                json!({ "level": level, "previous": fresh.level }),
            ));
        }

        Ok(())
    }
}

