use crate::services::notifier::{DynNotifier, BALANCE_UPDATE, WITHDRAWAL_UPDATE};
use database::{
    user::repository::DynUserRepository,
    withdrawal::{
        model::{Withdrawal, WithdrawalStatus},
        repository::DynWithdrawalRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use utils::{normalize_tx_hash, Amount, AppError, AppResult};

pub struct WithdrawalService {
    users: DynUserRepository,
    withdrawals: DynWithdrawalRepository,
    notifier: DynNotifier,
    min_withdrawal: Amount,
    fee_bps: u32,
}

impl WithdrawalService {
    pub fn new(
        users: DynUserRepository,
        withdrawals: DynWithdrawalRepository,
        notifier: DynNotifier,
        min_withdrawal: Amount,
        fee_bps: u32,
    ) -> Self {
        Self {
            users,
            withdrawals,
            notifier,
            min_withdrawal,
            fee_bps,
        }
    }

    /// 申请提现，申请时即从 wallet 扣款
    pub async fn request_withdrawal(&self, user_id: &ObjectId, amount: Decimal) -> AppResult<Withdrawal> {
        let amount = Amount::from_decimal(amount)?;
        if amount < self.min_withdrawal {
            return Err(AppError::BadRequest(format!(
                "Minimum withdrawal is {} USDT.",
                self.min_withdrawal
            )));
        }

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found.", user_id)))?;
        if user.is_blocked {
            return Err(AppError::Forbidden("Account is blocked.".to_string()));
        }

        if !self.users.debit_wallet(&user.id, amount).await? {
            return Err(AppError::BadRequest("Insufficient wallet balance.".to_string()));
        }

        let fee = amount.bps(self.fee_bps);
        let withdrawal = Withdrawal {
            id: ObjectId::new(),
            user_id: user.id,
            wallet_address: user.wallet_address.clone(),
            amount,
            fee,
            net_amount: amount - fee,
            status: WithdrawalStatus::Pending,
            tx_hash: None,
            created_at: chrono::Utc::now().timestamp(),
            processed_at: None,
        };
        let withdrawal = self.withdrawals.create_withdrawal(withdrawal).await?;

        info!("🏧 withdrawal {} of {} USDT requested by {}", withdrawal.id, amount, user.id);

        self.notifier
            .emit(
                BALANCE_UPDATE,
                Some(&user.wallet_address),
                json!({ "reason": "withdrawal", "amount": amount.to_decimal() }),
            )
            .await;

        Ok(withdrawal)
    }

    pub async fn approve(&self, id: &ObjectId, tx_hash: &str) -> AppResult<Withdrawal> {
        let tx_hash = normalize_tx_hash(tx_hash)?;
        let withdrawal = self.finish(id, WithdrawalStatus::Approved, Some(tx_hash)).await?;

        info!("✅ withdrawal {} approved", withdrawal.id);
        Ok(withdrawal)
    }

    /// 驳回并原额退回 wallet
    pub async fn reject(&self, id: &ObjectId) -> AppResult<Withdrawal> {
        let withdrawal = self.finish(id, WithdrawalStatus::Rejected, None).await?;

        self.users.credit_wallet(&withdrawal.user_id, withdrawal.amount).await?;

        info!("↩️ withdrawal {} rejected, {} USDT refunded", withdrawal.id, withdrawal.amount);
        self.notifier
            .emit(
                BALANCE_UPDATE,
                Some(&withdrawal.wallet_address),
                json!({ "reason": "refund", "amount": withdrawal.amount.to_decimal() }),
            )
            .await;

        Ok(withdrawal)
    }

    pub async fn list_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        self.withdrawals.list_withdrawals_by_user(user_id).await
    }

    pub async fn list(
        &self,
        status: Option<WithdrawalStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<Withdrawal>, u64)> {
        self.withdrawals.list_withdrawals(status, page, limit).await
    }

    async fn finish(&self, id: &ObjectId, status: WithdrawalStatus, tx_hash: Option<String>) -> AppResult<Withdrawal> {
        let Some(withdrawal) = self.withdrawals.finish_pending(id, status, tx_hash).await? else {
            return match self.withdrawals.get_withdrawal(id).await? {
                Some(existing) => Err(AppError::Conflict(format!(
                    "Withdrawal {} is already {}.",
                    id, existing.status
                ))),
                None => Err(AppError::NotFound(format!("Withdrawal {} not found.", id))),
            };
        };

        self.notifier
            .emit(
                WITHDRAWAL_UPDATE,
                Some(&withdrawal.wallet_address),
                json!({
                    "id": withdrawal.id.to_hex(),
                    "status": withdrawal.status.to_string(),
                    "txHash": withdrawal.tx_hash,
                }),
            )
            .await;

        Ok(withdrawal)
    }
}
