use crate::{
    dtos::validate_positive,
    services::deposit_service::{DepositReceipt, DepositStatus},
};
use database::deposit::model::{Deposit, DepositSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 前端上报充值
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct SubmitDepositDto {
    #[validate(length(equal = 42, message = "must be a 0x-prefixed 20-byte address"))]
    pub wallet_address: String,
    #[validate(custom = "validate_positive")]
    #[schema(value_type = String, example = "100")]
    pub amount: Decimal,
    #[validate(length(equal = 66, message = "must be a 0x-prefixed 32-byte hash"))]
    pub tx_hash: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
pub struct CheckTransactionDto {
    #[validate(length(equal = 66, message = "must be a 0x-prefixed 32-byte hash"))]
    pub tx_hash: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DepositDto {
    pub id: String,
    pub wallet_address: String,
    pub amount: Decimal,
    pub chain: String,
    pub token: String,
    pub tx_hash: String,
    pub confirmed: bool,
    #[schema(value_type = String, example = "client")]
    pub source: DepositSource,
    pub created_at: i64,
    pub confirmed_at: Option<i64>,
}

impl From<Deposit> for DepositDto {
    fn from(deposit: Deposit) -> Self {
        Self {
            id: deposit.id.to_hex(),
            wallet_address: deposit.wallet_address,
            amount: deposit.amount.to_decimal(),
            chain: deposit.chain,
            token: deposit.token,
            tx_hash: deposit.tx_hash,
            confirmed: deposit.confirmed,
            source: deposit.source,
            created_at: deposit.created_at,
            confirmed_at: deposit.confirmed_at,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DepositResultDto {
    /// confirmed / pending / invalid
    pub status: String,
    pub deposit: Option<DepositDto>,
    pub message: Option<String>,
}

impl From<DepositReceipt> for DepositResultDto {
    fn from(receipt: DepositReceipt) -> Self {
        let status = match receipt.status {
            DepositStatus::Confirmed => "confirmed",
            DepositStatus::Pending => "pending",
            DepositStatus::Invalid => "invalid",
        };

        Self {
            status: status.to_string(),
            deposit: receipt.deposit.map(DepositDto::from),
            message: receipt.message,
        }
    }
}
