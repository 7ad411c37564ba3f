// Timer: 按 cron 表达式定时触发充值轮询
// - 上一轮尚未结束时跳过本轮，避免同一进程内重叠扫描
use chrono::Utc;
use cron::Schedule;
use server::services::chain::DynDepositScanner;
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::watch, time::sleep_until};
use tracing::{error, info, warn};

// "0 */2 * * * *": 每两分钟执行
pub const DEFAULT_SCHEDULE: &str = "0 */2 * * * *";

#[derive(Clone)]
pub struct Timer {
    pub time: String,
    pub scanner: DynDepositScanner,
    running: Arc<AtomicBool>,
}

impl Timer {
    pub fn new(time: Option<String>, scanner: DynDepositScanner) -> Self {
        Timer {
            time: time.unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
            scanner,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn schedule(&self) -> Result<Schedule, cron::error::Error> {
        Schedule::from_str(&self.time)
    }

    /// 运行到 `shutdown` 变为 true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let schedule = match self.schedule() {
            Ok(schedule) => schedule,
            Err(e) => {
                error!("❌ invalid poll schedule {:?}: {}", self.time, e);
                return;
            }
        };

        info!("⏳ Timer polls deposits on {:?}.", self.time);

        loop {
            let now = Utc::now();
            let Some(next_run_time) = schedule.upcoming(Utc).next() else {
                warn!("⏳ schedule {:?} has no upcoming run, timer stopped", self.time);
                return;
            };

            let duration_until_next_run = (next_run_time - now).to_std().unwrap_or(Duration::from_secs(0));

            tokio::select! {
                _ = sleep_until(tokio::time::Instant::now() + duration_until_next_run) => {}
                _ = shutdown.changed() => {
                    info!("⏳ Timer stopped");
                    return;
                }
            }

            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.tick().await;
            });
        }
    }

    /// 执行一轮扫描，上一轮仍在运行时返回 false
    pub async fn tick(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("⏳ previous poll still running, skipping this tick");
            return false;
        }

        match self.scanner.scan_once().await {
            Ok(Some(report)) => info!(
                "⏳ poll finished: blocks {}..={} created={}",
                report.from_block, report.to_block, report.created
            ),
            Ok(None) => info!("⏳ poll skipped: nothing new or lease held elsewhere"),
            Err(e) => error!("❌ poll failed: {}", e),
        }

        self.running.store(false, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use server::services::chain::{DepositScannerTrait, ScanReport};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use utils::AppResult;

    #[derive(Default)]
    struct SlowScanner {
        calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl DepositScannerTrait for SlowScanner {
        async fn scan_once(&self) -> AppResult<Option<ScanReport>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(Some(ScanReport::default()))
        }
    }

    #[test]
    fn test_default_schedule_parses() {
        let scanner = Arc::new(SlowScanner::default());
        let timer = Timer::new(None, scanner);
        assert!(timer.schedule().is_ok());

        let scanner = Arc::new(SlowScanner::default());
        assert!(Timer::new(Some("not a cron".to_string()), scanner).schedule().is_err());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let scanner = Arc::new(SlowScanner::default());
        let timer = Arc::new(Timer::new(None, scanner.clone()));

        let first = tokio::spawn({
            let timer = timer.clone();
            async move { timer.tick().await }
        });

        while scanner.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(!timer.tick().await);

        scanner.release.notify_one();
        assert!(first.await.unwrap());

        // 上一轮结束后可以再次执行
        let second = tokio::spawn({
            let timer = timer.clone();
            async move { timer.tick().await }
        });
        while scanner.calls.load(Ordering::SeqCst) == 1 {
            tokio::task::yield_now().await;
        }
        scanner.release.notify_one();
        assert!(second.await.unwrap());
    }
}
