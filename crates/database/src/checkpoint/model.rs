use serde::{Deserialize, Serialize};

/// 轮询检查点 + 运行租约
///
/// `_id` 为轮询器名称，每个轮询器一条记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerCheckpoint {
    #[serde(rename = "_id")]
    pub name: String,
    /// 最后处理完成的区块
    #[serde(default)]
    pub last_block: Option<i64>,
    /// 当前持有租约的实例
    #[serde(default)]
    pub holder: Option<String>,
    /// 租约过期时间戳(秒)
    #[serde(default)]
    pub locked_until: i64,
    pub updated_at: i64,
}
