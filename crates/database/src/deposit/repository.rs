use crate::{deposit::model::Deposit, doc_i64, duplicate_key_to_conflict, Database};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use std::sync::Arc;
use utils::{Amount, AppResult};

pub type DynDepositRepository = Arc<dyn DepositRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait DepositRepositoryTrait {
    // 重复的 tx_hash 返回 Conflict
    async fn create_deposit(&self, deposit: Deposit) -> AppResult<Deposit>;

    async fn get_deposit_by_hash(&self, tx_hash: &str) -> AppResult<Option<Deposit>>;

    // 只有把 confirmed 从 false 改成 true 的那次调用会拿到记录
    async fn mark_confirmed(&self, tx_hash: &str) -> AppResult<Option<Deposit>>;

    // 入账与分佣全部完成
    async fn mark_settled(&self, tx_hash: &str) -> AppResult<()>;

    async fn list_deposits_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Deposit>>;

    async fn list_deposits(&self, confirmed: Option<bool>, page: u64, limit: u64) -> AppResult<(Vec<Deposit>, u64)>;

    async fn total_confirmed_volume(&self) -> AppResult<Amount>;
}

#[async_trait]
impl DepositRepositoryTrait for Database {
    async fn create_deposit(&self, deposit: Deposit) -> AppResult<Deposit> {
        self.deposits
            .insert_one(&deposit, None)
            .await
            .map_err(|e| duplicate_key_to_conflict(e, &format!("Deposit {} already exists.", deposit.tx_hash)))?;

        Ok(deposit)
    }

    async fn get_deposit_by_hash(&self, tx_hash: &str) -> AppResult<Option<Deposit>> {
        let deposit = self
            .deposits
            .find_one(doc! { "tx_hash": tx_hash.to_lowercase() }, None)
            .await?;

        Ok(deposit)
    }

    async fn mark_confirmed(&self, tx_hash: &str) -> AppResult<Option<Deposit>> {
        let filter = doc! { "tx_hash": tx_hash.to_lowercase(), "confirmed": false };
        let update = doc! {
            "$set": {
                "confirmed": true,
                "confirmed_at": chrono::Utc::now().timestamp(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let deposit = self.deposits.find_one_and_update(filter, update, options).await?;

        Ok(deposit)
    }

    async fn mark_settled(&self, tx_hash: &str) -> AppResult<()> {
        self.deposits
            .update_one(
                doc! { "tx_hash": tx_hash.to_lowercase(), "confirmed": true },
                doc! {
                    "$set": {
                        "settled": true,
                        "settled_at": chrono::Utc::now().timestamp(),
                    }
                },
                None,
            )
            .await?;

        Ok(())
    }

    async fn list_deposits_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Deposit>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.deposits.find(doc! { "user_id": *user_id }, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn list_deposits(&self, confirmed: Option<bool>, page: u64, limit: u64) -> AppResult<(Vec<Deposit>, u64)> {
        let filter = match confirmed {
            Some(confirmed) => doc! { "confirmed": confirmed },
            None => Document::new(),
        };

        let total = self.deposits.count_documents(filter.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(page.saturating_sub(1) * limit)
            .limit(limit as i64)
            .build();
        let cursor = self.deposits.find(filter, options).await?;

        Ok((cursor.try_collect().await?, total))
    }

    async fn total_confirmed_volume(&self) -> AppResult<Amount> {
        let pipeline = vec![
            doc! { "$match": { "confirmed": true } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$amount" } } },
        ];

        let mut cursor = self.deposits.aggregate(pipeline, None).await?;

        let total = match cursor.try_next().await? {
            Some(doc) => doc_i64(&doc, "total"),
            None => 0,
        };

        Ok(Amount::from_micros(total))
    }
}
