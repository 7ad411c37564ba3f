pub mod admin_dto;
pub mod auth_dto;
pub mod deposit_dto;
pub mod reward_dto;
pub mod staking_dto;
pub mod user_dto;
pub mod withdrawal_dto;

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_be_positive"))
    }
}
