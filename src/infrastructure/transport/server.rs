/// 司机连接服务器
///
/// 每个 TCP 连接对应一个司机设备：
/// - 接受后分配连接ID并发送 `connected` 问候
/// - `driver-info` 事件 → `DispatchEngine::on_presence_report`
/// - 连接关闭或读取错误 → `DispatchEngine::on_disconnect`
/// - 出站队列中的帧（例如 `new-booking`）写回连接

use crate::application::ports::EventEmitter;
use crate::application::services::DispatchEngine;
use crate::infrastructure::transport::codec::frame_codec;
use crate::infrastructure::transport::hub::ConnectionHub;
use crate::infrastructure::transport::listener::accept_next;
use crate::shared::error::TransportError;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{ConnectionId, Envelope, EVENT_DRIVER_INFO};
use futures::{SinkExt, StreamExt};
use socket2::{SockRef, TcpKeepalive};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// TCP 保活间隔，用于发现掉线的移动设备
const KEEPALIVE_TIME: Duration = Duration::from_secs(30);

pub struct DriverServer<E: EventEmitter + 'static> {
    listener: TcpListener,
    engine: Arc<DispatchEngine<E>>,
    hub: Arc<ConnectionHub>,
}

impl<E: EventEmitter + 'static> DriverServer<E> {
    /// 绑定监听地址
    pub async fn bind(
        addr: SocketAddr,
        engine: Arc<DispatchEngine<E>>,
        hub: Arc<ConnectionHub>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            engine,
            hub,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// 接受连接循环，为每个连接 spawn 一个任务
    pub async fn run(self) -> Result<(), TransportError> {
        info!(addr = %self.local_addr()?, session = self.hub.session_id(), "driver server listening");

        loop {
            let (stream, peer) = accept_next(&self.listener, "driver").await;
            let engine = Arc::clone(&self.engine);
            let hub = Arc::clone(&self.hub);

            tokio::spawn(async move {
                handle_connection(stream, peer, engine, hub).await;
            });
        }
    }
}

fn configure_keepalive(stream: &TcpStream) {
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_TIME);
    if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        debug!(error = %e, "failed to enable TCP keepalive");
    }
}

// 处理单个司机连接
async fn handle_connection<E: EventEmitter>(
    stream: TcpStream,
    peer: SocketAddr,
    engine: Arc<DispatchEngine<E>>,
    hub: Arc<ConnectionHub>,
) {
    configure_keepalive(&stream);

    let (connection_id, mut outbound_rx) = hub.register();
    METRICS.active_connections.inc();
    info!(%connection_id, %peer, "driver connected");

    let mut framed = Framed::new(stream, frame_codec());

    let greeted = match Envelope::connected(&connection_id).encode() {
        Ok(frame) => framed.send(frame).await.is_ok(),
        Err(e) => {
            warn!(%connection_id, error = %e, "failed to encode greeting");
            false
        }
    };

    if greeted {
        loop {
            tokio::select! {
                // 从司机接收数据
                inbound = framed.next() => {
                    match inbound {
                        Some(Ok(buf)) => handle_frame(&engine, &connection_id, &buf),
                        Some(Err(e)) => {
                            debug!(%connection_id, error = %e, "read error, closing connection");
                            break;
                        }
                        None => break, // 连接已关闭
                    }
                }
                // 出站事件写回司机
                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = framed.send(frame).await {
                        debug!(%connection_id, error = %e, "write error, closing connection");
                        break;
                    }
                }
            }
        }
    }

    // 先移除状态，再注销连接：断开后立刻不可被调度
    engine.on_disconnect(&connection_id);
    hub.unregister(&connection_id);
    METRICS.active_connections.dec();
    info!(%connection_id, %peer, "driver disconnected");
}

fn handle_frame<E: EventEmitter>(
    engine: &DispatchEngine<E>,
    connection_id: &ConnectionId,
    buf: &[u8],
) {
    let envelope = match Envelope::decode(buf) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(%connection_id, error = %e, "unparseable frame from driver");
            return;
        }
    };

    match envelope.event.as_str() {
        EVENT_DRIVER_INFO => {
            if let Err(e) = engine.on_presence_report(connection_id, envelope.data) {
                warn!(%connection_id, error = %e, "presence report rejected");
            }
        }
        other => {
            debug!(%connection_id, event = other, "ignoring unknown event");
        }
    }
}
