use crate::{
    duplicate_key_to_conflict,
    user::model::{Investment, User},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson},
    options::FindOptions,
};
use std::sync::Arc;
use utils::{Amount, AppError, AppResult};

pub type DynUserRepository = Arc<dyn UserRepositoryTrait + Send + Sync>;

// 主要用于Service中，表示提供了该Trait功能
#[async_trait]
pub trait UserRepositoryTrait {
    // 注册用户(邮箱/钱包/邀请码均唯一)
    async fn create_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn get_user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>>;

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>>;

    // 充值确认后入账：usdt_balance/self_business 增加，并追加一笔质押记录
    // 以 tx_hash 去重，已入账或用户不存在时返回 false
    async fn apply_deposit(&self, id: &ObjectId, tx_hash: &str, investment: Investment) -> AppResult<bool>;

    // 仅当 key 不在 commission_keys 中时才入账，返回是否入账
    async fn credit_commission(&self, id: &ObjectId, key: &str, amount: Amount) -> AppResult<bool>;

    // 同一笔下级充值只计入一次，返回是否计入
    async fn add_direct_business(&self, id: &ObjectId, tx_hash: &str, amount: Amount) -> AppResult<bool>;

    async fn count_directs(&self, id: &ObjectId) -> AppResult<i64>;

    // 有过确认充值的直推人数
    async fn count_active_directs(&self, id: &ObjectId) -> AppResult<i64>;

    async fn update_team_stats(&self, id: &ObjectId, total_team: i64, active_users: i64, level: u32) -> AppResult<()>;

    async fn credit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<()>;

    // 余额不足时不扣款并返回 false
    async fn debit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<bool>;

    // 奖励档位只能领取一次
    async fn claim_tier(&self, id: &ObjectId, tier: u32, reward: Amount) -> AppResult<bool>;

    // 乐观锁：version 不匹配时返回 false
    async fn replace_investments(
        &self,
        id: &ObjectId,
        expected_version: i64,
        investments: Vec<Investment>,
        credited: Amount,
    ) -> AppResult<bool>;

    async fn list_directs(&self, id: &ObjectId) -> AppResult<Vec<User>>;

    async fn list_users(&self, page: u64, limit: u64) -> AppResult<(Vec<User>, u64)>;

    async fn set_blocked(&self, id: &ObjectId, blocked: bool) -> AppResult<bool>;
}

#[async_trait]
impl UserRepositoryTrait for Database {
    async fn create_user(&self, user: User) -> AppResult<User> {
        self.users
            .insert_one(&user, None)
            .await
            .map_err(|e| duplicate_key_to_conflict(e, "User with this email or wallet already exists."))?;

        Ok(user)
    }

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "_id": *id }, None).await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "email": email.to_lowercase() }, None).await?;

        Ok(user)
    }

    async fn get_user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        let user = self
            .users
            .find_one(doc! { "wallet_address": wallet.to_lowercase() }, None)
            .await?;

        Ok(user)
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let user = self
            .users
            .find_one(doc! { "referral_code": code.to_uppercase() }, None)
            .await?;

        Ok(user)
    }

    async fn apply_deposit(&self, id: &ObjectId, tx_hash: &str, investment: Investment) -> AppResult<bool> {
        let amount = investment.amount.micros();
        let investment = to_bson(&investment).map_err(|e| AppError::InternalServerErrorWithContext(e.to_string()))?;

        let update = doc! {
            "$inc": {
                "usdt_balance": amount,
                "self_business": amount,
                "version": 1_i64,
            },
            "$push": { "investments": investment, "deposit_keys": tx_hash },
        };

        let filter = doc! { "_id": *id, "deposit_keys": { "$ne": tx_hash } };
        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn credit_commission(&self, id: &ObjectId, key: &str, amount: Amount) -> AppResult<bool> {
        // 过滤条件与更新在同一条语句里，并发的重复入账只会有一条命中
        let filter = doc! { "_id": *id, "commission_keys": { "$ne": key } };
        let update = doc! {
            "$inc": { "wallet": amount.micros(), "version": 1_i64 },
            "$push": { "commission_keys": key },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn add_direct_business(&self, id: &ObjectId, tx_hash: &str, amount: Amount) -> AppResult<bool> {
        let result = self
            .users
            .update_one(
                doc! { "_id": *id, "direct_business_keys": { "$ne": tx_hash } },
                doc! {
                    "$inc": { "direct_business": amount.micros(), "version": 1_i64 },
                    "$push": { "direct_business_keys": tx_hash },
                },
                None,
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn count_directs(&self, id: &ObjectId) -> AppResult<i64> {
        let count = self.users.count_documents(doc! { "referred_by": *id }, None).await?;

        Ok(count as i64)
    }

    async fn count_active_directs(&self, id: &ObjectId) -> AppResult<i64> {
        let count = self
            .users
            .count_documents(doc! { "referred_by": *id, "usdt_balance": { "$gt": 0_i64 } }, None)
            .await?;

        Ok(count as i64)
    }

    async fn update_team_stats(&self, id: &ObjectId, total_team: i64, active_users: i64, level: u32) -> AppResult<()> {
        self.users
            .update_one(
                doc! { "_id": *id },
                doc! {
                    "$set": {
                        "total_team": total_team,
                        "active_users": active_users,
                        "level": level as i64,
                    },
                    "$inc": { "version": 1_i64 },
                },
                None,
            )
            .await?;

        Ok(())
    }

    async fn credit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<()> {
        self.users
            .update_one(
                doc! { "_id": *id },
                doc! { "$inc": { "wallet": amount.micros(), "version": 1_i64 } },
                None,
            )
            .await?;

        Ok(())
    }

    async fn debit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<bool> {
        let filter = doc! { "_id": *id, "wallet": { "$gte": amount.micros() } };
        let update = doc! { "$inc": { "wallet": amount.negate().micros(), "version": 1_i64 } };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn claim_tier(&self, id: &ObjectId, tier: u32, reward: Amount) -> AppResult<bool> {
        let filter = doc! { "_id": *id, "claimed_tiers": { "$ne": tier as i64 } };
        let update = doc! {
            "$inc": { "wallet": reward.micros(), "version": 1_i64 },
            "$push": { "claimed_tiers": tier as i64 },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn replace_investments(
        &self,
        id: &ObjectId,
        expected_version: i64,
        investments: Vec<Investment>,
        credited: Amount,
    ) -> AppResult<bool> {
        let investments = to_bson(&investments).map_err(|e| AppError::InternalServerErrorWithContext(e.to_string()))?;

        let filter = doc! { "_id": *id, "version": expected_version };
        let update = doc! {
            "$set": { "investments": investments },
            "$inc": { "wallet": credited.micros(), "version": 1_i64 },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn list_directs(&self, id: &ObjectId) -> AppResult<Vec<User>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.users.find(doc! { "referred_by": *id }, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn list_users(&self, page: u64, limit: u64) -> AppResult<(Vec<User>, u64)> {
        let total = self.users.count_documents(doc! {}, None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(page.saturating_sub(1) * limit)
            .limit(limit as i64)
            .build();
        let cursor = self.users.find(doc! {}, options).await?;

        Ok((cursor.try_collect().await?, total))
    }

    async fn set_blocked(&self, id: &ObjectId, blocked: bool) -> AppResult<bool> {
        let result = self
            .users
            .update_one(doc! { "_id": *id }, doc! { "$set": { "is_blocked": blocked } }, None)
            .await?;

        Ok(result.matched_count == 1)
    }
}
