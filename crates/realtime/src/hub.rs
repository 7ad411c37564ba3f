use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// 每个频道的缓冲区大小，慢消费者超过后会丢帧
pub const CHANNEL_CAPACITY: usize = 256;

/// 推送给客户端的帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    pub data: Value,
}

/// 一个连接的订阅：全局频道 + 可选的钱包房间
pub struct Subscription {
    pub global: broadcast::Receiver<String>,
    pub room: Option<broadcast::Receiver<String>>,
}

/// 房间与广播频道
pub struct Hub {
    global: broadcast::Sender<String>,
    rooms: DashMap<String, broadcast::Sender<String>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        let (global, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            global,
            rooms: DashMap::new(),
        }
    }

    /// 房间名即小写钱包地址
    pub fn subscribe(&self, room: Option<&str>) -> Subscription {
        let room = room.map(|name| {
            self.rooms
                .entry(name.to_lowercase())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        });

        Subscription {
            global: self.global.subscribe(),
            room,
        }
    }

    /// 推送事件，返回收到该帧的连接数
    pub fn emit(&self, event: &str, data: Value, room: Option<&str>) -> usize {
        let frame = Frame {
            event: event.to_string(),
            data,
        };
        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠️ cannot serialize frame {}: {}", event, e);
                return 0;
            }
        };

        let delivered = match room {
            Some(name) => match self.rooms.get(&name.to_lowercase()) {
                Some(sender) => sender.send(payload).unwrap_or(0),
                None => 0,
            },
            None => self.global.send(payload).unwrap_or(0),
        };

        debug!("📣 {} -> {:?}: delivered to {}", event, room, delivered);
        delivered
    }

    /// 清理没有订阅者的房间
    pub fn prune(&self) {
        self.rooms.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.global.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WALLET: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn test_room_emit_reaches_only_that_room() {
        let hub = Hub::new();
        let mut alice = hub.subscribe(Some(WALLET));
        let mut bob = hub.subscribe(Some("0x00000000000000000000000000000000000000b2"));

        let delivered = hub.emit("balanceUpdate", json!({ "usdtBalance": "12" }), Some(&WALLET.to_uppercase()));
        assert_eq!(delivered, 1);

        let raw = alice.room.as_mut().unwrap().try_recv().unwrap();
        let frame: Frame = serde_json::from_str(&raw).unwrap();
        assert_eq!(frame.event, "balanceUpdate");
        assert_eq!(frame.data["usdtBalance"], "12");

        assert!(bob.room.as_mut().unwrap().try_recv().is_err());
        assert!(alice.global.try_recv().is_err());
    }

    #[test]
    fn test_global_emit_reaches_everyone() {
        let hub = Hub::new();
        let mut a = hub.subscribe(Some(WALLET));
        let mut b = hub.subscribe(None);

        assert_eq!(hub.emit("announcement", json!({}), None), 2);
        assert!(a.global.try_recv().is_ok());
        assert!(b.global.try_recv().is_ok());
    }

    #[test]
    fn test_emit_without_listeners_is_dropped() {
        let hub = Hub::new();
        assert_eq!(hub.emit("balanceUpdate", json!({}), Some(WALLET)), 0);
        assert_eq!(hub.emit("balanceUpdate", json!({}), None), 0);
    }

    #[test]
    fn test_prune_removes_empty_rooms() {
        let hub = Hub::new();
        let sub = hub.subscribe(Some(WALLET));
        let _other = hub.subscribe(Some("0x00000000000000000000000000000000000000b2"));
        assert_eq!(hub.room_count(), 2);

        drop(sub);
        hub.prune();
        assert_eq!(hub.room_count(), 1);
        assert_eq!(hub.connection_count(), 1);
    }
}
