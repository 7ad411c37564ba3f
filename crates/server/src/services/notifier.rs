use async_trait::async_trait;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};
use utils::AppConfig;

pub const BALANCE_UPDATE: &str = "balanceUpdate";
pub const LEVEL_UPDATE: &str = "levelUpdate";
pub const WITHDRAWAL_UPDATE: &str = "withdrawalUpdate";

pub const EMIT_TOKEN_HEADER: &str = "x-emit-token";

pub type DynNotifier = Arc<dyn NotifierTrait + Send + Sync>;

/// 实时推送，尽力而为：失败只记日志，不影响业务结果
#[async_trait]
pub trait NotifierTrait {
    /// `wallet` 为空时全局广播，否则只推送到该钱包的房间
    async fn emit(&self, event: &str, wallet: Option<&str>, data: Value);
}

/// 待发送的事件
///
/// 资金流程中先收集，流程结束后统一发送。
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: &'static str,
    pub wallet: Option<String>,
    pub data: Value,
}

impl Notification {
    pub fn to_wallet(event: &'static str, wallet: &str, data: Value) -> Self {
        Self {
            event,
            wallet: Some(wallet.to_string()),
            data,
        }
    }
}

/// 依次发送收集到的事件
pub async fn emit_all(notifier: &DynNotifier, notifications: Vec<Notification>) {
    for notification in notifications {
        notifier
            .emit(notification.event, notification.wallet.as_deref(), notification.data)
            .await;
    }
}

/// 通过实时推送服务的 `POST /emit` 转发事件
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpNotifier {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: format!("{}/emit", base_url.trim_end_matches('/')),
            token,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.socket_server_url, config.emit_token.clone())
    }
}

#[async_trait]
impl NotifierTrait for HttpNotifier {
    async fn emit(&self, event: &str, wallet: Option<&str>, data: Value) {
        let body = json!({
            "event": event,
            "data": data,
            "wallet": wallet.map(str::to_lowercase),
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.header(EMIT_TOKEN_HEADER, token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("📣 emitted {} to {}", event, wallet.unwrap_or("*"));
            }
            Ok(response) => warn!("⚠️ notifier responded {} for event {}", response.status(), event),
            Err(e) => warn!("⚠️ failed to emit {}: {}", event, e),
        }
    }
}
