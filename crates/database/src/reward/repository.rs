use crate::{
    doc_i64,
    reward::model::{RewardClaim, TierClaimStats},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::FindOptions,
};
use std::sync::Arc;
use utils::{Amount, AppResult};

pub type DynRewardRepository = Arc<dyn RewardRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait RewardRepositoryTrait {
    async fn create_claim(&self, claim: RewardClaim) -> AppResult<()>;

    // 某个用户的领取记录
    async fn list_claims_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<RewardClaim>>;

    // 按档位汇总
    async fn claim_stats(&self) -> AppResult<Vec<TierClaimStats>>;
}

#[async_trait]
impl RewardRepositoryTrait for Database {
    async fn create_claim(&self, claim: RewardClaim) -> AppResult<()> {
        self.reward_claims.insert_one(claim, None).await?;

        Ok(())
    }

    async fn list_claims_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<RewardClaim>> {
        let options = FindOptions::builder().sort(doc! { "tier": 1 }).build();
        let cursor = self.reward_claims.find(doc! { "user_id": *user_id }, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn claim_stats(&self) -> AppResult<Vec<TierClaimStats>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$tier", "claims": { "$sum": 1_i64 }, "amount": { "$sum": "$amount" } } },
            doc! { "$sort": { "_id": 1 } },
        ];

        let mut cursor = self.reward_claims.aggregate(pipeline, None).await?;

        let mut stats = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            stats.push(TierClaimStats {
                tier: doc_i64(&doc, "_id") as u32,
                claims: doc_i64(&doc, "claims"),
                amount: Amount::from_micros(doc_i64(&doc, "amount")),
            });
        }

        Ok(stats)
    }
}
