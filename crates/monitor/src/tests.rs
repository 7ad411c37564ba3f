use crate::{
    client::{ObservedTransfer, TransferSource},
    poller::{DepositPoller, PollerSettings, POLLER_NAME},
};
use async_trait::async_trait;
use database::{
    checkpoint::repository::CheckpointRepositoryTrait,
    deposit::model::Deposit,
};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use server::services::{
    chain::{DepositScannerTrait, VerifiedTransfer},
    deposit_service::{ConfirmOutcome, DepositReceipt, DepositServiceTrait, IngestOutcome},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use utils::{Amount, AppError, AppResult};

struct FakeChain {
    latest: u64,
    transfers: Vec<ObservedTransfer>,
    requested: Mutex<Vec<(u64, u64)>>,
}

#[async_trait]
impl TransferSource for FakeChain {
    async fn latest_block(&self) -> eyre::Result<u64> {
        Ok(self.latest)
    }

    async fn incoming_transfers(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<ObservedTransfer>> {
        self.requested.lock().unwrap().push((from_block, to_block));
        Ok(self
            .transfers
            .iter()
            .filter(|t| (from_block..=to_block).contains(&t.transfer.block_number))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MemoryCheckpoints {
    blocks: Mutex<HashMap<String, u64>>,
    holder: Mutex<Option<String>>,
}

#[async_trait]
impl CheckpointRepositoryTrait for MemoryCheckpoints {
    async fn acquire_lease(&self, _name: &str, holder: &str, _ttl_secs: i64) -> AppResult<bool> {
        let mut current = self.holder.lock().unwrap();
        match current.as_deref() {
            Some(h) if h != holder => Ok(false),
            _ => {
                *current = Some(holder.to_string());
                Ok(true)
            }
        }
    }

    async fn release_lease(&self, _name: &str, holder: &str) -> AppResult<()> {
        let mut current = self.holder.lock().unwrap();
        if current.as_deref() == Some(holder) {
            *current = None;
        }
        Ok(())
    }

    async fn get_last_block(&self, name: &str) -> AppResult<Option<u64>> {
        Ok(self.blocks.lock().unwrap().get(name).copied())
    }

    async fn save_last_block(&self, name: &str, block: u64) -> AppResult<()> {
        self.blocks.lock().unwrap().insert(name.to_string(), block);
        Ok(())
    }
}

/// 只实现轮询器用到的 ingest_transfer
#[derive(Default)]
struct FakeDeposits {
    known_senders: HashSet<String>,
    seen: Mutex<HashSet<String>>,
    failing: Option<String>,
    /// 已确认但入账未完成的交易
    unsettled: Mutex<HashSet<String>>,
}

#[async_trait]
impl DepositServiceTrait for FakeDeposits {
    async fn submit_deposit(&self, _wallet: &str, _amount: Decimal, _tx_hash: &str) -> AppResult<DepositReceipt> {
        Err(AppError::NotFound("unused".to_string()))
    }

    async fn check_transaction(&self, _tx_hash: &str) -> AppResult<DepositReceipt> {
        Err(AppError::NotFound("unused".to_string()))
    }

    async fn confirm_deposit(&self, _tx_hash: &str) -> AppResult<ConfirmOutcome> {
        Err(AppError::NotFound("unused".to_string()))
    }

    async fn ingest_transfer(&self, tx_hash: &str, transfer: &VerifiedTransfer) -> AppResult<IngestOutcome> {
        if self.failing.as_deref() == Some(tx_hash) {
            return Err(AppError::InternalServerErrorWithContext("boom".to_string()));
        }
        if !self.known_senders.contains(&transfer.from) {
            return Ok(IngestOutcome::UnknownSender);
        }
        if transfer.amount < Amount::from_usdt(10) {
            return Ok(IngestOutcome::BelowMinimum);
        }
        if self.unsettled.lock().unwrap().remove(tx_hash) {
            return Ok(IngestOutcome::Resumed);
        }
        if !self.seen.lock().unwrap().insert(tx_hash.to_string()) {
            return Ok(IngestOutcome::Duplicate);
        }
        Ok(IngestOutcome::Created)
    }

    async fn list_user_deposits(&self, _user_id: &ObjectId) -> AppResult<Vec<Deposit>> {
        Ok(vec![])
    }
}

const ALICE: &str = "0x00000000000000000000000000000000000000a1";
const STRANGER: &str = "0x00000000000000000000000000000000000000ee";

fn observed(n: u8, from: &str, usdt: i64, block: u64) -> ObservedTransfer {
    ObservedTransfer {
        tx_hash: format!("0x{}", format!("{:02x}", n).repeat(32)),
        transfer: VerifiedTransfer {
            from: from.to_string(),
            to: "0x00000000000000000000000000000000000000d1".to_string(),
            amount: Amount::from_usdt(usdt),
            block_number: block,
        },
    }
}

fn settings() -> PollerSettings {
    PollerSettings {
        required_confirmations: 3,
        lookback_blocks: 100,
        max_block_range: 50,
    }
}

struct Harness {
    chain: Arc<FakeChain>,
    checkpoints: Arc<MemoryCheckpoints>,
    poller: DepositPoller,
}

fn harness(latest: u64, transfers: Vec<ObservedTransfer>, deposits: FakeDeposits) -> Harness {
    let chain = Arc::new(FakeChain {
        latest,
        transfers,
        requested: Mutex::new(vec![]),
    });
    let checkpoints = Arc::new(MemoryCheckpoints::default());
    let poller = DepositPoller::new(chain.clone(), Arc::new(deposits), checkpoints.clone(), settings());

    Harness {
        chain,
        checkpoints,
        poller,
    }
}

fn alice_deposits() -> FakeDeposits {
    FakeDeposits {
        known_senders: HashSet::from([ALICE.to_string()]),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scan_tallies_outcomes_and_saves_checkpoint() {
    let transfers = vec![
        observed(1, ALICE, 50, 960),
        observed(2, STRANGER, 50, 961),
        observed(3, ALICE, 5, 962),
    ];
    let h = harness(1_000, transfers, alice_deposits());

    let report = h.poller.scan_once().await.unwrap().unwrap();

    // 首次运行: [998 - 100, 998]，跨度上限 50
    assert_eq!((report.from_block, report.to_block), (898, 947));
    assert_eq!(report.seen, 0);

    let report = h.poller.scan_once().await.unwrap().unwrap();
    assert_eq!((report.from_block, report.to_block), (948, 997));
    assert_eq!(report.seen, 3);
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 2);

    assert_eq!(h.checkpoints.get_last_block(POLLER_NAME).await.unwrap(), Some(997));
    assert_eq!(h.chain.requested.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_caught_up_returns_none() {
    let h = harness(1_000, vec![], alice_deposits());
    h.checkpoints.save_last_block(POLLER_NAME, 998).await.unwrap();

    assert!(h.poller.scan_once().await.unwrap().is_none());
    assert!(h.chain.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_includes_block_with_exact_confirmations() {
    // 998 在 latest 1000 时正好 3 个确认，999 还差一个
    let transfers = vec![observed(1, ALICE, 50, 998), observed(2, ALICE, 50, 999)];
    let h = harness(1_000, transfers, alice_deposits());
    h.checkpoints.save_last_block(POLLER_NAME, 990).await.unwrap();

    let report = h.poller.scan_once().await.unwrap().unwrap();
    assert_eq!((report.from_block, report.to_block), (991, 998));
    assert_eq!(report.seen, 1);
    assert_eq!(report.created, 1);

    h.checkpoints.save_last_block(POLLER_NAME, 998).await.unwrap();
    assert!(h.poller.scan_once().await.unwrap().is_none());
    assert!(h.chain.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rescan_is_idempotent() {
    let h = harness(1_000, vec![observed(1, ALICE, 50, 990)], alice_deposits());
    h.checkpoints.save_last_block(POLLER_NAME, 980).await.unwrap();

    let first = h.poller.scan_once().await.unwrap().unwrap();
    assert_eq!(first.created, 1);

    // 回退检查点后重扫同一区间
    h.checkpoints.save_last_block(POLLER_NAME, 980).await.unwrap();
    let second = h.poller.scan_once().await.unwrap().unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 1);
}

#[tokio::test]
async fn test_lease_held_by_another_run_skips() {
    let h = harness(1_000, vec![observed(1, ALICE, 50, 990)], alice_deposits());
    h.checkpoints.acquire_lease(POLLER_NAME, "other-host", 300).await.unwrap();

    assert!(h.poller.scan_once().await.unwrap().is_none());
    assert!(h.chain.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_keeps_checkpoint_before_failed_block() {
    let failing = observed(2, ALICE, 50, 992);
    let deposits = FakeDeposits {
        failing: Some(failing.tx_hash.clone()),
        ..alice_deposits()
    };
    let h = harness(1_000, vec![observed(1, ALICE, 50, 990), failing], deposits);
    h.checkpoints.save_last_block(POLLER_NAME, 980).await.unwrap();

    assert!(h.poller.scan_once().await.is_err());
    assert_eq!(h.checkpoints.get_last_block(POLLER_NAME).await.unwrap(), Some(991));

    // 租约已释放
    assert!(h.checkpoints.acquire_lease(POLLER_NAME, "other-host", 300).await.unwrap());
}

#[tokio::test]
async fn test_resumed_settlement_counts_as_created() {
    let unfinished = observed(1, ALICE, 50, 990);
    let deposits = FakeDeposits {
        unsettled: Mutex::new(HashSet::from([unfinished.tx_hash.clone()])),
        ..alice_deposits()
    };
    let h = harness(1_000, vec![unfinished], deposits);
    h.checkpoints.save_last_block(POLLER_NAME, 980).await.unwrap();

    let report = h.poller.scan_once().await.unwrap().unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 0);
}
