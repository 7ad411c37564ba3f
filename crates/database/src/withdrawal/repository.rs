use crate::{
    withdrawal::model::{Withdrawal, WithdrawalStatus},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use std::sync::Arc;
use utils::AppResult;

pub type DynWithdrawalRepository = Arc<dyn WithdrawalRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait WithdrawalRepositoryTrait {
    async fn create_withdrawal(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal>;

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>>;

    async fn list_withdrawals_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Withdrawal>>;

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<Withdrawal>, u64)>;

    // 仅处理 pending 状态的申请，状态已变化时返回 None
    async fn finish_pending(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        tx_hash: Option<String>,
    ) -> AppResult<Option<Withdrawal>>;

    async fn count_by_status(&self, status: WithdrawalStatus) -> AppResult<u64>;
}

fn status_filter(status: Option<WithdrawalStatus>) -> Document {
    match status {
        Some(status) => doc! { "status": status.to_string() },
        None => Document::new(),
    }
}

#[async_trait]
impl WithdrawalRepositoryTrait for Database {
    async fn create_withdrawal(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        self.withdrawals.insert_one(&withdrawal, None).await?;

        Ok(withdrawal)
    }

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>> {
        let withdrawal = self.withdrawals.find_one(doc! { "_id": *id }, None).await?;

        Ok(withdrawal)
    }

    async fn list_withdrawals_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.withdrawals.find(doc! { "user_id": *user_id }, options).await?;

        Ok(cursor.try_collect().await?)
    }

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<Withdrawal>, u64)> {
        let filter = status_filter(status);
        let total = self.withdrawals.count_documents(filter.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(page.saturating_sub(1) * limit)
            .limit(limit as i64)
            .build();
        let cursor = self.withdrawals.find(filter, options).await?;

        Ok((cursor.try_collect().await?, total))
    }

    async fn finish_pending(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        tx_hash: Option<String>,
    ) -> AppResult<Option<Withdrawal>> {
        let filter = doc! { "_id": *id, "status": WithdrawalStatus::Pending.to_string() };
        let update = doc! {
            "$set": {
                "status": status.to_string(),
                "tx_hash": tx_hash,
                "processed_at": chrono::Utc::now().timestamp(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let withdrawal = self.withdrawals.find_one_and_update(filter, update, options).await?;

        Ok(withdrawal)
    }

    async fn count_by_status(&self, status: WithdrawalStatus) -> AppResult<u64> {
        let count = self.withdrawals.count_documents(status_filter(Some(status)), None).await?;

        Ok(count)
    }
}
