use crate::dtos::validate_positive;
use database::withdrawal::model::Withdrawal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct WithdrawalRequestDto {
    #[validate(custom = "validate_positive")]
    #[schema(value_type = String, example = "50")]
    pub amount: Decimal,
}

/// 管理员批准时填写打款交易
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct ApproveWithdrawalDto {
    #[validate(length(equal = 66, message = "must be a 0x-prefixed 32-byte hash"))]
    pub tx_hash: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct WithdrawalDto {
    pub id: String,
    pub user_id: String,
    pub wallet_address: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    /// pending / approved / rejected
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
    pub processed_at: Option<i64>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            id: withdrawal.id.to_hex(),
            user_id: withdrawal.user_id.to_hex(),
            wallet_address: withdrawal.wallet_address,
            amount: withdrawal.amount.to_decimal(),
            fee: withdrawal.fee.to_decimal(),
            net_amount: withdrawal.net_amount.to_decimal(),
            status: withdrawal.status.to_string(),
            tx_hash: withdrawal.tx_hash,
            created_at: withdrawal.created_at,
            processed_at: withdrawal.processed_at,
        }
    }
}
