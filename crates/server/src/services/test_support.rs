//! 内存版仓储与桩实现，Service 测试不依赖 MongoDB

use crate::{
    auth::JwtManager,
    services::{
        chain::{TransactionVerification, TransactionVerifierTrait},
        notifier::NotifierTrait,
        Repositories, ServiceSettings, Services,
    },
};
use async_trait::async_trait;
use database::{
    commission::{model::Commission, repository::CommissionRepositoryTrait},
    deposit::{model::Deposit, repository::DepositRepositoryTrait},
    reward::{
        model::{RewardClaim, TierClaimStats},
        repository::RewardRepositoryTrait,
    },
    user::{
        model::{Investment, User},
        repository::UserRepositoryTrait,
    },
    withdrawal::{
        model::{Withdrawal, WithdrawalStatus},
        repository::WithdrawalRepositoryTrait,
    },
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use utils::{Amount, AppError, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<HashMap<ObjectId, User>>,
    pub deposits: Mutex<Vec<Deposit>>,
    pub commissions: Mutex<Vec<Commission>>,
    pub withdrawals: Mutex<Vec<Withdrawal>>,
    pub claims: Mutex<Vec<RewardClaim>>,
    /// 给该用户入账佣金时返回一次错误
    pub fail_credit_for: Mutex<Option<ObjectId>>,
}

fn paginate<T: Clone>(items: Vec<T>, page: u64, limit: u64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = (page.saturating_sub(1) * limit) as usize;
    (items.into_iter().skip(skip).take(limit as usize).collect(), total)
}

impl MemoryStore {
    pub fn user(&self, id: &ObjectId) -> User {
        self.users.lock().unwrap()[id].clone()
    }

    pub fn insert_user(&self, user: User) -> User {
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn update_user(&self, id: &ObjectId, f: impl FnOnce(&mut User)) {
        if let Some(user) = self.users.lock().unwrap().get_mut(id) {
            f(user);
        }
    }

    pub fn deposit_count(&self) -> usize {
        self.deposits.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email == user.email || u.wallet_address == user.wallet_address)
        {
            return Err(AppError::Conflict("User with this email or wallet already exists.".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self.users.lock().unwrap().values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        let wallet = wallet.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.wallet_address == wallet)
            .cloned())
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let code = code.to_uppercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn apply_deposit(&self, id: &ObjectId, tx_hash: &str, investment: Investment) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };
        if user.deposit_keys.iter().any(|k| k == tx_hash) {
            return Ok(false);
        }
        user.deposit_keys.push(tx_hash.to_string());
        user.usdt_balance += investment.amount;
        user.self_business += investment.amount;
        user.investments.push(investment);
        user.version += 1;
        Ok(true)
    }

    async fn credit_commission(&self, id: &ObjectId, key: &str, amount: Amount) -> AppResult<bool> {
        {
            let mut fail = self.fail_credit_for.lock().unwrap();
            if *fail == Some(*id) {
                *fail = None;
                return Err(AppError::InternalServerErrorWithContext("connection reset".to_string()));
            }
        }
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if !user.commission_keys.iter().any(|k| k == key) => {
                user.wallet += amount;
                user.commission_keys.push(key.to_string());
                user.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_direct_business(&self, id: &ObjectId, tx_hash: &str, amount: Amount) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if !user.direct_business_keys.iter().any(|k| k == tx_hash) => {
                user.direct_business += amount;
                user.direct_business_keys.push(tx_hash.to_string());
                user.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_directs(&self, id: &ObjectId) -> AppResult<i64> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.referred_by == Some(*id))
            .count() as i64)
    }

    async fn count_active_directs(&self, id: &ObjectId) -> AppResult<i64> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.referred_by == Some(*id) && u.usdt_balance.is_positive())
            .count() as i64)
    }

    async fn update_team_stats(&self, id: &ObjectId, total_team: i64, active_users: i64, level: u32) -> AppResult<()> {
        self.update_user(id, |u| {
            u.total_team = total_team;
            u.active_users = active_users;
            u.level = level;
            u.version += 1;
        });
        Ok(())
    }

    async fn credit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<()> {
        self.update_user(id, |u| {
            u.wallet += amount;
            u.version += 1;
        });
        Ok(())
    }

    async fn debit_wallet(&self, id: &ObjectId, amount: Amount) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if user.wallet >= amount => {
                user.wallet = user.wallet - amount;
                user.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_tier(&self, id: &ObjectId, tier: u32, reward: Amount) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if !user.claimed_tiers.contains(&tier) => {
                user.wallet += reward;
                user.claimed_tiers.push(tier);
                user.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_investments(
        &self,
        id: &ObjectId,
        expected_version: i64,
        investments: Vec<Investment>,
        credited: Amount,
    ) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) if user.version == expected_version => {
                user.investments = investments;
                user.wallet += credited;
                user.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_directs(&self, id: &ObjectId) -> AppResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.referred_by == Some(*id))
            .cloned()
            .collect())
    }

    async fn list_users(&self, page: u64, limit: u64) -> AppResult<(Vec<User>, u64)> {
        let users: Vec<User> = self.users.lock().unwrap().values().cloned().collect();
        Ok(paginate(users, page, limit))
    }

    async fn set_blocked(&self, id: &ObjectId, blocked: bool) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) => {
                user.is_blocked = blocked;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DepositRepositoryTrait for MemoryStore {
    async fn create_deposit(&self, deposit: Deposit) -> AppResult<Deposit> {
        let mut deposits = self.deposits.lock().unwrap();
        if deposits.iter().any(|d| d.tx_hash == deposit.tx_hash) {
            return Err(AppError::Conflict(format!("Deposit {} already exists.", deposit.tx_hash)));
        }
        deposits.push(deposit.clone());
        Ok(deposit)
    }

    async fn get_deposit_by_hash(&self, tx_hash: &str) -> AppResult<Option<Deposit>> {
        let tx_hash = tx_hash.to_lowercase();
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.tx_hash == tx_hash)
            .cloned())
    }

    async fn mark_confirmed(&self, tx_hash: &str) -> AppResult<Option<Deposit>> {
        let tx_hash = tx_hash.to_lowercase();
        let mut deposits = self.deposits.lock().unwrap();
        match deposits.iter_mut().find(|d| d.tx_hash == tx_hash && !d.confirmed) {
            Some(deposit) => {
                deposit.confirmed = true;
                deposit.confirmed_at = Some(chrono::Utc::now().timestamp());
                Ok(Some(deposit.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_settled(&self, tx_hash: &str) -> AppResult<()> {
        let tx_hash = tx_hash.to_lowercase();
        let mut deposits = self.deposits.lock().unwrap();
        if let Some(deposit) = deposits.iter_mut().find(|d| d.tx_hash == tx_hash && d.confirmed) {
            deposit.settled = true;
            deposit.settled_at = Some(chrono::Utc::now().timestamp());
        }
        Ok(())
    }

    async fn list_deposits_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Deposit>> {
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn list_deposits(&self, confirmed: Option<bool>, page: u64, limit: u64) -> AppResult<(Vec<Deposit>, u64)> {
        let deposits: Vec<Deposit> = self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .filter(|d| confirmed.map_or(true, |c| d.confirmed == c))
            .cloned()
            .collect();
        Ok(paginate(deposits, page, limit))
    }

    async fn total_confirmed_volume(&self) -> AppResult<Amount> {
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.confirmed)
            .map(|d| d.amount)
            .sum())
    }
}

#[async_trait]
impl CommissionRepositoryTrait for MemoryStore {
    async fn create_commission(&self, commission: Commission) -> AppResult<bool> {
        let mut commissions = self.commissions.lock().unwrap();
        if commissions.iter().any(|c| {
            c.beneficiary_id == commission.beneficiary_id
                && c.depositor_id == commission.depositor_id
                && c.level == commission.level
        }) {
            return Ok(false);
        }
        commissions.push(commission);
        Ok(true)
    }

    async fn list_commissions_by_beneficiary(&self, beneficiary_id: &ObjectId) -> AppResult<Vec<Commission>> {
        Ok(self
            .commissions
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.beneficiary_id == *beneficiary_id)
            .cloned()
            .collect())
    }

    async fn total_commission_volume(&self) -> AppResult<Amount> {
        Ok(self.commissions.lock().unwrap().iter().map(|c| c.amount).sum())
    }
}

#[async_trait]
impl WithdrawalRepositoryTrait for MemoryStore {
    async fn create_withdrawal(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        self.withdrawals.lock().unwrap().push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>> {
        Ok(self.withdrawals.lock().unwrap().iter().find(|w| w.id == *id).cloned())
    }

    async fn list_withdrawals_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<(Vec<Withdrawal>, u64)> {
        let withdrawals: Vec<Withdrawal> = self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| status.map_or(true, |s| w.status == s))
            .cloned()
            .collect();
        Ok(paginate(withdrawals, page, limit))
    }

    async fn finish_pending(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        tx_hash: Option<String>,
    ) -> AppResult<Option<Withdrawal>> {
        let mut withdrawals = self.withdrawals.lock().unwrap();
        match withdrawals
            .iter_mut()
            .find(|w| w.id == *id && w.status == WithdrawalStatus::Pending)
        {
            Some(withdrawal) => {
                withdrawal.status = status;
                withdrawal.tx_hash = tx_hash;
                withdrawal.processed_at = Some(chrono::Utc::now().timestamp());
                Ok(Some(withdrawal.clone()))
            }
            None => Ok(None),
        }
    }

    async fn count_by_status(&self, status: WithdrawalStatus) -> AppResult<u64> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.status == status)
            .count() as u64)
    }
}

#[async_trait]
impl RewardRepositoryTrait for MemoryStore {
    async fn create_claim(&self, claim: RewardClaim) -> AppResult<()> {
        self.claims.lock().unwrap().push(claim);
        Ok(())
    }

    async fn list_claims_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<RewardClaim>> {
        Ok(self
            .claims
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn claim_stats(&self) -> AppResult<Vec<TierClaimStats>> {
        let mut by_tier: HashMap<u32, TierClaimStats> = HashMap::new();
        for claim in self.claims.lock().unwrap().iter() {
            let entry = by_tier.entry(claim.tier).or_insert(TierClaimStats {
                tier: claim.tier,
                claims: 0,
                amount: Amount::ZERO,
            });
            entry.claims += 1;
            entry.amount += claim.amount;
        }
        let mut stats: Vec<TierClaimStats> = by_tier.into_values().collect();
        stats.sort_by_key(|s| s.tier);
        Ok(stats)
    }
}

/// 记录所有推送事件，可设置每次推送的延迟
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(String, Option<String>, Value)>>,
    pub delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// 推送在后台任务里完成，等到收到 `count` 条或超时
    pub async fn wait_for(&self, event: &str, count: usize) -> Vec<(Option<String>, Value)> {
        for _ in 0..200 {
            let events = self.events_named(event);
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events_named(event)
    }

    pub fn events_named(&self, event: &str) -> Vec<(Option<String>, Value)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == event)
            .map(|(_, wallet, data)| (wallet.clone(), data.clone()))
            .collect()
    }
}

#[async_trait]
impl NotifierTrait for RecordingNotifier {
    async fn emit(&self, event: &str, wallet: Option<&str>, data: Value) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), wallet.map(str::to_string), data));
    }
}

/// 按交易哈希返回预设结果，未设置的一律 Pending
#[derive(Default)]
pub struct StubVerifier {
    pub results: Mutex<HashMap<String, TransactionVerification>>,
}

impl StubVerifier {
    pub fn set(&self, tx_hash: &str, verification: TransactionVerification) {
        self.results.lock().unwrap().insert(tx_hash.to_lowercase(), verification);
    }
}

#[async_trait]
impl TransactionVerifierTrait for StubVerifier {
    async fn verify_transaction(&self, tx_hash: &str) -> AppResult<TransactionVerification> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&tx_hash.to_lowercase())
            .cloned()
            .unwrap_or_else(|| TransactionVerification::Pending("Transaction not found yet.".to_string())))
    }
}

pub const TEST_JWT_SECRET: &str = "test_jwt_secret_for_unit_tests_only";

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        min_deposit: Amount::from_usdt(10),
        min_withdrawal: Amount::from_usdt(10),
        withdrawal_fee_bps: 500,
        daily_roi_bps: 50,
        max_return_bps: 20_000,
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: Arc<StubVerifier>,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(notifier);
        let verifier = Arc::new(StubVerifier::default());

        let repositories = Repositories {
            users: store.clone(),
            deposits: store.clone(),
            commissions: store.clone(),
            withdrawals: store.clone(),
            rewards: store.clone(),
        };
        let services = Services::with_parts(
            repositories,
            test_settings(),
            Arc::new(JwtManager::new(TEST_JWT_SECRET, 24)),
            verifier.clone(),
            notifier.clone(),
        );

        Self {
            store,
            notifier,
            verifier,
            services,
        }
    }

    /// 创建用户，钱包地址由序号生成
    pub fn seed_user(&self, n: u8, referred_by: Option<ObjectId>) -> User {
        let user = User::new(
            &format!("user{}@example.com", n),
            "unused".to_string(),
            &wallet(n),
            format!("CODE{:04}", n),
            referred_by,
        );
        self.store.insert_user(user)
    }
}

pub fn wallet(n: u8) -> String {
    format!("0x{:040x}", n)
}

pub fn tx_hash(n: u8) -> String {
    format!("0x{:064x}", n)
}
