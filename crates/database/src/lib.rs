////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 实际的数据库底层操作(以 Trait 形式暴露给 Service)
//
//////////////////////////////////////////////////////////////////////

use mongodb::{
    bson::{doc, Bson, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, AppError, AppResult};

pub mod checkpoint;
pub mod commission;
pub mod deposit;
pub mod reward;
pub mod user;
pub mod withdrawal;

#[derive(Clone, Debug)]
pub struct Database {
    pub users: Collection<user::model::User>,
    pub deposits: Collection<deposit::model::Deposit>,
    pub commissions: Collection<commission::model::Commission>,
    pub withdrawals: Collection<withdrawal::model::Withdrawal>,
    pub reward_claims: Collection<reward::model::RewardClaim>,
    pub poller_checkpoints: Collection<checkpoint::model::PollerCheckpoint>,
}

impl Database {
    pub async fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let users = db.collection("User");
        let deposits = db.collection("Deposit");
        let commissions = db.collection("Commission");
        let withdrawals = db.collection("Withdrawal");
        let reward_claims = db.collection("RewardClaim");
        let poller_checkpoints = db.collection("PollerCheckpoint");

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            users,
            deposits,
            commissions,
            withdrawals,
            reward_claims,
            poller_checkpoints,
        })
    }

    /// 初始化索引
    ///
    /// 唯一索引承担去重：重复 tx_hash 的并发插入只会成功一条
    pub async fn init_indexes(&self) -> AppResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        let user_indexes = vec![
            IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
            IndexModel::builder().keys(doc! { "wallet_address": 1 }).options(unique()).build(),
            IndexModel::builder().keys(doc! { "referral_code": 1 }).options(unique()).build(),
            IndexModel::builder().keys(doc! { "referred_by": 1 }).build(),
        ];
        self.users.create_indexes(user_indexes, None).await?;

        let deposit_indexes = vec![
            IndexModel::builder().keys(doc! { "tx_hash": 1 }).options(unique()).build(),
            IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build(),
            IndexModel::builder().keys(doc! { "confirmed": 1, "settled": 1 }).build(),
        ];
        self.deposits.create_indexes(deposit_indexes, None).await?;

        let commission_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "beneficiary_id": 1, "depositor_id": 1, "level": 1 })
                .options(unique())
                .build(),
            IndexModel::builder().keys(doc! { "beneficiary_id": 1, "created_at": -1 }).build(),
            IndexModel::builder().keys(doc! { "depositor_id": 1 }).build(),
        ];
        self.commissions.create_indexes(commission_indexes, None).await?;

        let withdrawal_indexes = vec![
            IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build(),
            IndexModel::builder().keys(doc! { "status": 1 }).build(),
        ];
        self.withdrawals.create_indexes(withdrawal_indexes, None).await?;

        let claim_indexes = vec![IndexModel::builder()
            .keys(doc! { "user_id": 1, "tier": 1 })
            .options(unique())
            .build()];
        self.reward_claims.create_indexes(claim_indexes, None).await?;

        info!("✅ database indexes initialized");
        Ok(())
    }
}

/// MongoDB 唯一索引冲突(E11000)
pub fn is_duplicate_key_error(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}

pub(crate) fn duplicate_key_to_conflict(err: MongoError, message: &str) -> AppError {
    if is_duplicate_key_error(&err) {
        AppError::Conflict(message.to_string())
    } else {
        AppError::MongoError(err)
    }
}

/// 聚合结果里的数字类型取决于输入，统一读成 i64
pub(crate) fn doc_i64(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(Bson::Int32(v)) => *v as i64,
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_i64_reads_any_numeric() {
        let doc = doc! { "a": 1_i32, "b": 2_i64, "c": 3.9_f64, "d": "x" };
        assert_eq!(doc_i64(&doc, "a"), 1);
        assert_eq!(doc_i64(&doc, "b"), 2);
        assert_eq!(doc_i64(&doc, "c"), 3);
        assert_eq!(doc_i64(&doc, "d"), 0);
        assert_eq!(doc_i64(&doc, "missing"), 0);
    }
}
