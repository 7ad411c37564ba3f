use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{AppConfig, CargoEnv};

pub struct Logger;
impl Logger {
    /// 返回的 guard 需要一直持有，drop 之后缓冲区中的日志会丢失
    pub fn new(config: &AppConfig) -> WorkerGuard {
        Self::new_with_log_dir(config.cargo_env, &config.rust_log, config.log_dir.clone())
    }

    pub fn new_with_log_dir(cargo_env: CargoEnv, default_filter: &str, log_dir: Option<PathBuf>) -> WorkerGuard {
        let (non_blocking, guard) = match cargo_env {
            CargoEnv::Development => tracing_appender::non_blocking(std::io::stdout()),
            CargoEnv::Production => {
                let log_directory = Self::get_log_directory(log_dir);

                if let Err(e) = std::fs::create_dir_all(&log_directory) {
                    eprintln!("⚠️ cannot create log dir {:?}: {}, falling back to ./logs", log_directory, e);
                    std::fs::create_dir_all("logs").ok();
                    tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "log"))
                } else {
                    println!("✅ logs are written to {:?}", log_directory);
                    tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_directory, "log"))
                }
            }
        };

        // env var: `RUST_LOG`
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{},tower_http=debug", default_filter).into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();

        guard
    }

    fn get_log_directory(log_dir: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = log_dir {
            return dir;
        }

        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                return exe_dir.join("logs");
            }
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("logs")
    }
}
