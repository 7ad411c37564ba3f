use crate::services::staking_service::{StakePosition, StakingSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct StakeDto {
    pub amount: Decimal,
    /// 入金时间戳(秒)
    pub date: i64,
    pub accrued: Decimal,
    pub paid_out: Decimal,
    pub claimable: Decimal,
    /// 收益进度(基点，10000 为封顶)
    pub progress_bps: u32,
    pub matured: bool,
}

impl From<&StakePosition> for StakeDto {
    fn from(position: &StakePosition) -> Self {
        Self {
            amount: position.amount.to_decimal(),
            date: position.date,
            accrued: position.accrued.to_decimal(),
            paid_out: position.paid_out.to_decimal(),
            claimable: position.claimable.to_decimal(),
            progress_bps: position.progress_bps,
            matured: position.matured,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct StakingTotalsDto {
    pub total_principal: Decimal,
    pub total_accrued: Decimal,
    pub total_paid_out: Decimal,
    pub total_claimable: Decimal,
}

impl From<&StakingSummary> for StakingTotalsDto {
    fn from(summary: &StakingSummary) -> Self {
        Self {
            total_principal: summary.total_principal.to_decimal(),
            total_accrued: summary.total_accrued.to_decimal(),
            total_paid_out: summary.total_paid_out.to_decimal(),
            total_claimable: summary.total_claimable.to_decimal(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct StakingSummaryDto {
    pub stakes: Vec<StakeDto>,
    pub totals: StakingTotalsDto,
}

impl From<StakingSummary> for StakingSummaryDto {
    fn from(summary: StakingSummary) -> Self {
        Self {
            stakes: summary.positions.iter().map(StakeDto::from).collect(),
            totals: (&summary).into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct HarvestDto {
    /// 本次入账金额
    pub credited: Decimal,
}
