use database::user::model::UserRole;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const TOKEN_ISSUER: &str = "stakeflow-api";

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID(ObjectId hex)
    pub sub: String,
    /// 钱包地址(小写)
    pub wallet: String,
    /// 用户角色
    pub role: UserRole,
    /// 过期时间
    pub exp: u64,
    /// 签发时间
    pub iat: u64,
    /// 签发者
    pub iss: String,
}

/// 认证中间件解析出的当前用户，放在请求扩展中
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub wallet_address: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
