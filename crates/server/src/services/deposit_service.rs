use crate::services::{
    chain::{DynTransactionVerifier, TransactionVerification, VerifiedTransfer},
    commission_service::{CommissionAward, CommissionService, Distribution},
    notifier::{emit_all, DynNotifier, Notification, BALANCE_UPDATE},
};
use async_trait::async_trait;
use database::{
    deposit::{
        model::{Deposit, DepositSource},
        repository::DynDepositRepository,
    },
    user::{
        model::{Investment, User},
        repository::DynUserRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use utils::{normalize_tx_hash, normalize_wallet, Amount, AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    Confirmed,
    Pending,
    Invalid,
}

/// 提交/查询充值后的结果
#[derive(Debug, Clone)]
pub struct DepositReceipt {
    pub status: DepositStatus,
    pub deposit: Option<Deposit>,
    pub message: Option<String>,
}

impl DepositReceipt {
    fn new(status: DepositStatus, deposit: Option<Deposit>, message: Option<String>) -> Self {
        Self {
            status,
            deposit,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// 本次调用完成了确认并入账
    Confirmed { deposit: Deposit, awards: Vec<CommissionAward> },
    AlreadyConfirmed(Deposit),
}

impl ConfirmOutcome {
    pub fn deposit(&self) -> &Deposit {
        match self {
            ConfirmOutcome::Confirmed { deposit, .. } => deposit,
            ConfirmOutcome::AlreadyConfirmed(deposit) => deposit,
        }
    }
}

/// 轮询器发现一笔转入后的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    /// 已确认但入账未完成的充值，本次补齐
    Resumed,
    UnknownSender,
    BlockedSender,
    /// 收款钱包转给自己
    SelfTransfer,
    BelowMinimum,
    Duplicate,
}

pub type DynDepositService = Arc<dyn DepositServiceTrait + Send + Sync>;

#[async_trait]
pub trait DepositServiceTrait {
    /// 前端上报的充值，先落库为未确认，再尝试链上校验
    async fn submit_deposit(&self, wallet: &str, amount: Decimal, tx_hash: &str) -> AppResult<DepositReceipt>;

    /// 按交易哈希到链上校验，校验通过则确认(未上报的交易会补建记录)
    async fn check_transaction(&self, tx_hash: &str) -> AppResult<DepositReceipt>;

    /// 确认流水线：原子翻转 confirmed -> 入账 -> 分佣 -> 标记 settled -> 推送
    ///
    /// 已确认但未 settled 的充值再次调用时继续入账
    async fn confirm_deposit(&self, tx_hash: &str) -> AppResult<ConfirmOutcome>;

    async fn ingest_transfer(&self, tx_hash: &str, transfer: &VerifiedTransfer) -> AppResult<IngestOutcome>;

    async fn list_user_deposits(&self, user_id: &ObjectId) -> AppResult<Vec<Deposit>>;
}

pub struct DepositService {
    users: DynUserRepository,
    deposits: DynDepositRepository,
    settlement: Settlement,
    verifier: DynTransactionVerifier,
    min_deposit: Amount,
}

/// 确认之后的入账与分佣
///
/// 在独立任务里执行，请求被取消或超时不会打断；每一步都以交易哈希去重，可重复执行。
#[derive(Clone)]
struct Settlement {
    users: DynUserRepository,
    deposits: DynDepositRepository,
    commission: Arc<CommissionService>,
    notifier: DynNotifier,
}

type Settled = (Deposit, Vec<CommissionAward>);

impl Settlement {
    fn spawn(self, deposit: Deposit) -> oneshot::Receiver<AppResult<Settled>> {
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            match self.settle(deposit).await {
                Ok((settled, notifications)) => {
                    let _ = tx.send(Ok(settled));
                    // 资金落库之后再推送
                    emit_all(&self.notifier, notifications).await;
                }
                Err(e) => {
                    error!("❌ settlement failed: {}", e);
                    let _ = tx.send(Err(e));
                }
            }
        });

        rx
    }

    async fn settle(&self, mut deposit: Deposit) -> AppResult<(Settled, Vec<Notification>)> {
        let investment = Investment {
            amount: deposit.amount,
            date: deposit.confirmed_at.unwrap_or(deposit.created_at),
            paid_out: Amount::ZERO,
        };

        if !self
            .users
            .apply_deposit(&deposit.user_id, &deposit.tx_hash, investment)
            .await?
        {
            info!("⏭️ deposit {} already applied to {}", deposit.tx_hash, deposit.user_id);
        }

        let Some(depositor) = self.users.get_user(&deposit.user_id).await? else {
            error!("❌ deposit {} confirmed but user {} is missing", deposit.tx_hash, deposit.user_id);
            return Err(AppError::NotFound(format!("User {} not found.", deposit.user_id)));
        };

        let Distribution { awards, notifications } = self.commission.distribute(&depositor, &deposit).await?;

        self.deposits.mark_settled(&deposit.tx_hash).await?;
        deposit.settled = true;
        deposit.settled_at = Some(chrono::Utc::now().timestamp());

        info!(
            "💰 deposit {} settled: {} USDT for {}, {} commission(s) paid",
            deposit.tx_hash,
            deposit.amount,
            depositor.wallet_address,
            awards.len()
        );

        let mut outbox = Vec::with_capacity(notifications.len() + 1);
        outbox.push(Notification::to_wallet(
            BALANCE_UPDATE,
            &depositor.wallet_address,
            json!({
                "reason": "deposit",
                "txHash": deposit.tx_hash,
                "amount": deposit.amount.to_decimal(),
                "usdtBalance": depositor.usdt_balance.to_decimal(),
            }),
        ));
        outbox.extend(notifications);

        Ok(((deposit, awards), outbox))
    }
}

impl DepositService {
    pub fn new(
        users: DynUserRepository,
        deposits: DynDepositRepository,
        commission: Arc<CommissionService>,
        verifier: DynTransactionVerifier,
        notifier: DynNotifier,
        min_deposit: Amount,
    ) -> Self {
        let settlement = Settlement {
            users: users.clone(),
            deposits: deposits.clone(),
            commission,
            notifier,
        };

        Self {
            users,
            deposits,
            settlement,
            verifier,
            min_deposit,
        }
    }

    fn ensure_minimum(&self, amount: Amount) -> AppResult<()> {
        if amount < self.min_deposit {
            return Err(AppError::BadRequest(format!(
                "Minimum deposit is {} USDT, got {}.",
                self.min_deposit, amount
            )));
        }
        Ok(())
    }

    async fn find_depositor(&self, wallet: &str) -> AppResult<User> {
        let user = self
            .users
            .get_user_by_wallet(wallet)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user registered with wallet {}.", wallet)))?;

        if user.is_blocked {
            return Err(AppError::Forbidden("Account is blocked.".to_string()));
        }
        Ok(user)
    }

    /// 校验失败不影响已落库的记录，之后可再次查询或由轮询器确认
    async fn verify_and_confirm(&self, deposit: Deposit) -> AppResult<DepositReceipt> {
        let verification = match self.verifier.verify_transaction(&deposit.tx_hash).await {
            Ok(verification) => verification,
            Err(e) => {
                warn!("⚠️ verification of {} unavailable: {}", deposit.tx_hash, e);
                return Ok(DepositReceipt::new(
                    DepositStatus::Pending,
                    Some(deposit),
                    Some("Verification is temporarily unavailable.".to_string()),
                ));
            }
        };

        match verification {
            TransactionVerification::Pending(reason) => {
                Ok(DepositReceipt::new(DepositStatus::Pending, Some(deposit), Some(reason)))
            }
            TransactionVerification::Invalid(reason) => {
                warn!("❌ deposit {} is invalid: {}", deposit.tx_hash, reason);
                Ok(DepositReceipt::new(DepositStatus::Invalid, Some(deposit), Some(reason)))
            }
            TransactionVerification::Verified(transfer) => {
                if let Err(reason) = transfer_matches(&deposit, &transfer) {
                    warn!("❌ deposit {} does not match chain data: {}", deposit.tx_hash, reason);
                    return Ok(DepositReceipt::new(DepositStatus::Invalid, Some(deposit), Some(reason)));
                }

                let outcome = self.confirm_deposit(&deposit.tx_hash).await?;
                Ok(DepositReceipt::new(
                    DepositStatus::Confirmed,
                    Some(outcome.deposit().clone()),
                    None,
                ))
            }
        }
    }
}

/// 链上转账必须来自登记的钱包，且金额不少于上报金额
fn transfer_matches(deposit: &Deposit, transfer: &VerifiedTransfer) -> Result<(), String> {
    if transfer.from == transfer.to {
        return Err("Transfers from the deposit wallet to itself are not deposits.".to_string());
    }
    if transfer.from != deposit.wallet_address {
        return Err(format!(
            "Transfer sender {} does not match wallet {}.",
            transfer.from, deposit.wallet_address
        ));
    }
    if transfer.amount < deposit.amount {
        return Err(format!(
            "Transferred {} USDT is less than the submitted {} USDT.",
            transfer.amount, deposit.amount
        ));
    }
    Ok(())
}

#[async_trait]
impl DepositServiceTrait for DepositService {
    async fn submit_deposit(&self, wallet: &str, amount: Decimal, tx_hash: &str) -> AppResult<DepositReceipt> {
        let wallet = normalize_wallet(wallet)?;
        let tx_hash = normalize_tx_hash(tx_hash)?;
        let amount = Amount::from_decimal(amount)?;

        self.ensure_minimum(amount)?;

        if self.deposits.get_deposit_by_hash(&tx_hash).await?.is_some() {
            return Err(AppError::Conflict(format!("Deposit {} already exists.", tx_hash)));
        }

        let user = self.find_depositor(&wallet).await?;

        // 并发的重复提交由 tx_hash 唯一索引兜底
        let deposit = self
            .deposits
            .create_deposit(Deposit::new(user.id, &wallet, amount, &tx_hash, DepositSource::Client))
            .await?;

        info!("📥 deposit {} of {} USDT submitted by {}", tx_hash, amount, wallet);

        self.verify_and_confirm(deposit).await
    }

    async fn check_transaction(&self, tx_hash: &str) -> AppResult<DepositReceipt> {
        let tx_hash = normalize_tx_hash(tx_hash)?;

        if let Some(deposit) = self.deposits.get_deposit_by_hash(&tx_hash).await? {
            if deposit.settled {
                return Ok(DepositReceipt::new(DepositStatus::Confirmed, Some(deposit), None));
            }
            if deposit.confirmed {
                let outcome = self.confirm_deposit(&tx_hash).await?;
                return Ok(DepositReceipt::new(
                    DepositStatus::Confirmed,
                    Some(outcome.deposit().clone()),
                    None,
                ));
            }
            return self.verify_and_confirm(deposit).await;
        }

        match self.verifier.verify_transaction(&tx_hash).await? {
            TransactionVerification::Pending(reason) => Ok(DepositReceipt::new(DepositStatus::Pending, None, Some(reason))),
            TransactionVerification::Invalid(reason) => Ok(DepositReceipt::new(DepositStatus::Invalid, None, Some(reason))),
            TransactionVerification::Verified(transfer) => {
                if transfer.from == transfer.to {
                    return Ok(DepositReceipt::new(
                        DepositStatus::Invalid,
                        None,
                        Some("Transfers from the deposit wallet to itself are not deposits.".to_string()),
                    ));
                }
                self.ensure_minimum(transfer.amount)?;
                let user = self.find_depositor(&transfer.from).await?;

                let deposit = Deposit::new(user.id, &user.wallet_address, transfer.amount, &tx_hash, DepositSource::Client);
                match self.deposits.create_deposit(deposit).await {
                    Ok(_) | Err(AppError::Conflict(_)) => {}
                    Err(e) => return Err(e),
                }

                let outcome = self.confirm_deposit(&tx_hash).await?;
                Ok(DepositReceipt::new(
                    DepositStatus::Confirmed,
                    Some(outcome.deposit().clone()),
                    None,
                ))
            }
        }
    }

    async fn confirm_deposit(&self, tx_hash: &str) -> AppResult<ConfirmOutcome> {
        let tx_hash = normalize_tx_hash(tx_hash)?;

        // 赢得 false -> true 翻转的调用入账；已确认未 settled 的继续补齐
        let deposit = match self.deposits.mark_confirmed(&tx_hash).await? {
            Some(deposit) => deposit,
            None => match self.deposits.get_deposit_by_hash(&tx_hash).await? {
                Some(deposit) if deposit.settled => return Ok(ConfirmOutcome::AlreadyConfirmed(deposit)),
                Some(deposit) if deposit.confirmed => {
                    warn!("🩹 deposit {} confirmed but not settled, resuming", tx_hash);
                    deposit
                }
                Some(_) => {
                    return Err(AppError::Conflict(format!("Deposit {} is being confirmed.", tx_hash)));
                }
                None => return Err(AppError::NotFound(format!("Deposit {} not found.", tx_hash))),
            },
        };

        let (deposit, awards) = self.settlement.clone().spawn(deposit).await.map_err(|_| {
            AppError::InternalServerErrorWithContext(format!("Settlement of deposit {} was aborted.", tx_hash))
        })??;

        Ok(ConfirmOutcome::Confirmed { deposit, awards })
    }

    async fn ingest_transfer(&self, tx_hash: &str, transfer: &VerifiedTransfer) -> AppResult<IngestOutcome> {
        let tx_hash = normalize_tx_hash(tx_hash)?;

        if transfer.from == transfer.to {
            return Ok(IngestOutcome::SelfTransfer);
        }

        let Some(user) = self.users.get_user_by_wallet(&transfer.from).await? else {
            return Ok(IngestOutcome::UnknownSender);
        };

        // 与前端上报一致：被封禁账号的转账不入账
        if user.is_blocked {
            warn!("🚫 transfer {} from blocked user {} skipped", tx_hash, user.wallet_address);
            return Ok(IngestOutcome::BlockedSender);
        }

        if transfer.amount < self.min_deposit {
            return Ok(IngestOutcome::BelowMinimum);
        }

        if let Some(existing) = self.deposits.get_deposit_by_hash(&tx_hash).await? {
            if existing.confirmed && !existing.settled {
                self.confirm_deposit(&tx_hash).await?;
                return Ok(IngestOutcome::Resumed);
            }
            return Ok(IngestOutcome::Duplicate);
        }

        let deposit = Deposit::new(user.id, &user.wallet_address, transfer.amount, &tx_hash, DepositSource::Poller);
        match self.deposits.create_deposit(deposit).await {
            Ok(_) => {}
            Err(AppError::Conflict(_)) => return Ok(IngestOutcome::Duplicate),
            Err(e) => return Err(e),
        }

        match self.confirm_deposit(&tx_hash).await? {
            ConfirmOutcome::Confirmed { .. } => Ok(IngestOutcome::Created),
            ConfirmOutcome::AlreadyConfirmed(_) => Ok(IngestOutcome::Duplicate),
        }
    }

    async fn list_user_deposits(&self, user_id: &ObjectId) -> AppResult<Vec<Deposit>> {
        self.deposits.list_deposits_by_user(user_id).await
    }
}
