// 接受连接，吞掉可恢复的 accept 错误
//
// 单个连接在握手阶段被对端中止只影响该连接，立即重试；文件描述符耗尽等
// 资源类错误短暂退避后重试，避免空转。两类错误都不会终止监听循环。

use crate::shared::metrics::METRICS;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

/// 资源类 accept 错误后的退避时间
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 下次 accept 前需要等待的时间
pub fn accept_retry_delay(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

/// 等待下一个连接；`listener_name` 用作指标标签
pub async fn accept_next(listener: &TcpListener, listener_name: &str) -> (TcpStream, SocketAddr) {
    loop {
        match listener.accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                METRICS.accept_errors_total.with_label_values(&[listener_name]).inc();
                let delay = accept_retry_delay(&e);
                warn!(listener = listener_name, error = %e, ?delay, "accept failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
