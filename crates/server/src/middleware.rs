use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::{net::SocketAddr, time::Instant};
use tracing::info;

/// 请求日志中间件
/// 记录每个HTTP请求的IP地址、方法、路径、状态码和耗时
pub async fn request_logger(ConnectInfo(addr): ConnectInfo<SocketAddr>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "📍 {} | {} {} | {} | {:.2}ms",
        addr.ip(),
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    response
}
