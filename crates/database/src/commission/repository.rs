use crate::{commission::model::Commission, doc_i64, Database};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document},
    options::{FindOptions, UpdateOptions},
};
use std::sync::Arc;
use utils::{Amount, AppError, AppResult};

pub type DynCommissionRepository = Arc<dyn CommissionRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait CommissionRepositoryTrait {
    // 每个 (上级, 充值用户, 层级) 只有一条流水，已存在时不写入并返回 false
    async fn create_commission(&self, commission: Commission) -> AppResult<bool>;

    // 某个上级获得的佣金流水
    async fn list_commissions_by_beneficiary(&self, beneficiary_id: &ObjectId) -> AppResult<Vec<Commission>>;

    async fn total_commission_volume(&self) -> AppResult<Amount>;
}

#[async_trait]
impl CommissionRepositoryTrait for Database {
    async fn create_commission(&self, commission: Commission) -> AppResult<bool> {
        let filter = doc! {
            "beneficiary_id": commission.beneficiary_id,
            "depositor_id": commission.depositor_id,
            "level": commission.level,
        };
        let row = to_document(&commission).map_err(|e| AppError::InternalServerErrorWithContext(e.to_string()))?;
        let options = UpdateOptions::builder().upsert(true).build();

        let result = self
            .commissions
            .update_one(filter, doc! { "$setOnInsert": row }, options)
            .await?;

        Ok(result.upserted_id.is_some())
    }

    async fn list_commissions_by_beneficiary(&self, beneficiary_id: &ObjectId) -> AppResult<Vec<Commission>> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self
            .commissions
            .find(doc! { "beneficiary_id": *beneficiary_id }, options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn total_commission_volume(&self) -> AppResult<Amount> {
        let pipeline = vec![doc! { "$group": { "_id": null, "total": { "$sum": "$amount" } } }];

        let mut cursor = self.commissions.aggregate(pipeline, None).await?;

        let total = match cursor.try_next().await? {
            Some(doc) => doc_i64(&doc, "total"),
            None => 0,
        };

        Ok(Amount::from_micros(total))
    }
}
