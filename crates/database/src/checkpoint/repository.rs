use crate::{checkpoint::model::PollerCheckpoint, is_duplicate_key_error, Database};
use async_trait::async_trait;
use mongodb::{bson::doc, options::UpdateOptions};
use std::sync::Arc;
use utils::AppResult;

pub type DynCheckpointRepository = Arc<dyn CheckpointRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait CheckpointRepositoryTrait {
    // 获取运行租约，其他实例持有且未过期时返回 false
    async fn acquire_lease(&self, name: &str, holder: &str, ttl_secs: i64) -> AppResult<bool>;

    async fn release_lease(&self, name: &str, holder: &str) -> AppResult<()>;

    async fn get_last_block(&self, name: &str) -> AppResult<Option<u64>>;

    async fn save_last_block(&self, name: &str, block: u64) -> AppResult<()>;
}

#[async_trait]
impl CheckpointRepositoryTrait for Database {
    async fn acquire_lease(&self, name: &str, holder: &str, ttl_secs: i64) -> AppResult<bool> {
        let now = chrono::Utc::now().timestamp();

        // 记录不存在时 upsert 插入；已被占用时过滤不命中，upsert 撞 _id 唯一键
        let filter = doc! {
            "_id": name,
            "$or": [
                { "locked_until": { "$lt": now } },
                { "holder": holder },
            ],
        };
        let update = doc! {
            "$set": {
                "holder": holder,
                "locked_until": now + ttl_secs,
                "updated_at": now,
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();

        match self.poller_checkpoints.update_one(filter, update, options).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key_error(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn release_lease(&self, name: &str, holder: &str) -> AppResult<()> {
        self.poller_checkpoints
            .update_one(
                doc! { "_id": name, "holder": holder },
                doc! { "$set": { "locked_until": 0_i64, "holder": null } },
                None,
            )
            .await?;

        Ok(())
    }

    async fn get_last_block(&self, name: &str) -> AppResult<Option<u64>> {
        let checkpoint: Option<PollerCheckpoint> = self.poller_checkpoints.find_one(doc! { "_id": name }, None).await?;

        Ok(checkpoint.and_then(|c| c.last_block).map(|b| b as u64))
    }

    async fn save_last_block(&self, name: &str, block: u64) -> AppResult<()> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.poller_checkpoints
            .update_one(
                doc! { "_id": name },
                doc! {
                    "$set": {
                        "last_block": block as i64,
                        "updated_at": chrono::Utc::now().timestamp(),
                    }
                },
                options,
            )
            .await?;

        Ok(())
    }
}
