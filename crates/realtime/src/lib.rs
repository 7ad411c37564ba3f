//! 实时推送服务
//!
//! 浏览器通过 `GET /ws?wallet=0x..` 建立 websocket 连接并加入以钱包地址命名的房间，
//! API 进程通过 `POST /emit` 把余额/等级变化推送给对应房间或全部连接。
//! 事件不落库，没有订阅者时直接丢弃。

pub mod hub;
pub mod router;
pub mod server;

pub use hub::{Frame, Hub};
pub use router::RealtimeRouter;
pub use server::RealtimeServer;
