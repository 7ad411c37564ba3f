use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    ///
    /// 日志系统此时尚未初始化，因此这里直接输出到控制台
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());

        let env_file = match cargo_env.as_str() {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  unknown CARGO_ENV: {}, falling back to .env.development", cargo_env);
                ".env.development"
            }
        };

        if !std::path::Path::new(env_file).exists() {
            eprintln!("⚠️  {} not found, trying .env", env_file);
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ loaded .env");
            } else {
                eprintln!("❌ no env file found, using process environment only");
            }
            return Ok(());
        }

        dotenvy::from_filename(env_file)?;
        println!("✅ loaded {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    #[clap(long, env, default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    #[clap(long, env, default_value = "stakeflow")]
    pub mongo_db: String,

    /// BSC JSON-RPC 节点(Ankr / Alchemy 等)
    #[clap(long, env, default_value = "https://bsc-dataseed.binance.org")]
    pub bsc_rpc_url: String,

    /// 平台收款钱包，所有充值都转入该地址
    #[clap(long, env)]
    pub deposit_wallet: String,

    /// BSC-USD (BEP-20, 18 decimals)
    #[clap(long, env, default_value = "0x55d398326f99059fF775485246999027B3197955")]
    pub usdt_contract: String,

    #[clap(long, env, default_value = "3")]
    pub required_confirmations: u64,

    /// 首次运行(无检查点)时向前回溯的区块数
    #[clap(long, env, default_value = "5000")]
    pub poll_lookback_blocks: u64,

    /// 单次 eth_getLogs 的最大区块跨度
    #[clap(long, env, default_value = "2000")]
    pub poll_max_block_range: u64,

    /// 秒级 cron 表达式，默认每两分钟轮询一次
    #[clap(long, env, default_value = "0 */2 * * * *")]
    pub poll_cron: String,

    #[clap(long, env, default_value = "10")]
    pub min_deposit: Decimal,

    #[clap(long, env, default_value = "10")]
    pub min_withdrawal: Decimal,

    #[clap(long, env, default_value = "500")]
    pub withdrawal_fee_bps: u32,

    #[clap(long, env, default_value = "50")]
    pub daily_roi_bps: u32,

    #[clap(long, env, default_value = "20000")]
    pub max_return_bps: u32,

    /// 实时推送服务地址(API 通过 POST {url}/emit 推送事件)
    #[clap(long, env, default_value = "http://127.0.0.1:4000")]
    pub socket_server_url: String,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub socket_host: String,

    #[clap(long, env, default_value = "4000")]
    pub socket_port: u16,

    /// /emit 共享密钥，未设置时不校验
    #[clap(long, env)]
    pub emit_token: Option<String>,

    /// 前端地址，用于 CORS；未设置时允许任意来源
    #[clap(long, env)]
    pub client_url: Option<String>,

    #[clap(long, env)]
    pub jwt_secret: String,

    #[clap(long, env, default_value = "24")]
    pub jwt_expires_in_hours: u64,

    #[clap(long, env)]
    pub admin_email: Option<String>,

    #[clap(long, env)]
    pub admin_password: Option<String>,

    /// 管理员账号绑定的钱包，不能与收款钱包相同
    #[clap(long, env, default_value = "0x0000000000000000000000000000000000000000")]
    pub admin_wallet: String,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,

    #[clap(long, env)]
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        EnvLoader::load_env_file().ok();
        AppConfig::parse()
    }
}

impl AppConfig {
    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "0.0.0.0".to_string(),
            app_port: 8765,
            mongodb_uri: std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "stakeflow_test".to_string()),
            bsc_rpc_url: "https://bsc-dataseed.binance.org".to_string(),
            deposit_wallet: "0x00000000000000000000000000000000000000d1".to_string(),
            usdt_contract: "0x55d398326f99059ff775485246999027b3197955".to_string(),
            required_confirmations: 3,
            poll_lookback_blocks: 5000,
            poll_max_block_range: 2000,
            poll_cron: "0 */2 * * * *".to_string(),
            min_deposit: Decimal::from(10),
            min_withdrawal: Decimal::from(10),
            withdrawal_fee_bps: 500,
            daily_roi_bps: 50,
            max_return_bps: 20_000,
            socket_server_url: "http://127.0.0.1:4000".to_string(),
            socket_host: "127.0.0.1".to_string(),
            socket_port: 4000,
            emit_token: None,
            client_url: None,
            jwt_secret: "test_jwt_secret_for_unit_tests_only".to_string(),
            jwt_expires_in_hours: 24,
            admin_email: None,
            admin_password: None,
            admin_wallet: "0x0000000000000000000000000000000000000000".to_string(),
            rust_log: "info".to_string(),
            log_dir: None,
        }
    }
}
