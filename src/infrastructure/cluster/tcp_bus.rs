/// TCP 总线客户端
///
/// 连接到 `BusRelay`，发布的消息经中继广播给所有实例（包括自己）。
/// 链路断开时自动重连（指数退避），断开期间 `publish` 返回
/// `BusError::Unavailable`，调用方退化为仅本地调度。

use crate::infrastructure::cluster::bus::{BusEnvelope, ClusterBus, BUS_CAPACITY};
use crate::infrastructure::transport::codec::frame_codec;
use crate::shared::error::BusError;
use crate::shared::metrics::METRICS;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

pub struct TcpBus {
    outbound: mpsc::UnboundedSender<BusEnvelope>,
    inbound: broadcast::Sender<BusEnvelope>,
    connected: Arc<AtomicBool>,
}

/// 链路结束原因
enum LinkEnd {
    /// 本地总线已释放，不再重连
    Shutdown,
    /// 中继关闭了连接
    Closed,
}

impl TcpBus {
    /// 启动后台链路任务，必须在 tokio 运行时内调用
    pub fn connect(relay_addr: SocketAddr) -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound, _) = broadcast::channel(BUS_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_link(
            relay_addr,
            outbound_rx,
            inbound.clone(),
            Arc::clone(&connected),
        ));

        Arc::new(Self {
            outbound,
            inbound,
            connected,
        })
    }
}

impl ClusterBus for TcpBus {
    fn publish(&self, envelope: BusEnvelope) -> Result<(), BusError> {
        if !self.is_available() {
            return Err(BusError::Unavailable("relay link is down".to_string()));
        }
        self.outbound
            .send(envelope)
            .map_err(|_| BusError::Unavailable("relay link task stopped".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<BusEnvelope> {
        self.inbound.subscribe()
    }

    fn is_available(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

async fn run_link(
    relay_addr: SocketAddr,
    mut outbound_rx: mpsc::UnboundedReceiver<BusEnvelope>,
    inbound_tx: broadcast::Sender<BusEnvelope>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match TcpStream::connect(relay_addr).await {
            Ok(stream) => {
                info!(%relay_addr, "connected to bus relay");
                connected.store(true, Ordering::Release);
                backoff = INITIAL_BACKOFF;

                let result = pump(stream, &mut outbound_rx, &inbound_tx).await;
                connected.store(false, Ordering::Release);

                match result {
                    Ok(LinkEnd::Shutdown) => {
                        debug!("bus handle dropped, stopping relay link");
                        return;
                    }
                    Ok(LinkEnd::Closed) => warn!(%relay_addr, "bus relay closed the link"),
                    Err(e) => {
                        METRICS.bus_errors_total.with_label_values(&[e.kind()]).inc();
                        warn!(%relay_addr, error = %e, "bus relay link failed");
                    }
                }
            }
            Err(e) => {
                METRICS.bus_errors_total.with_label_values(&["connect"]).inc();
                warn!(%relay_addr, error = %e, retry_in = ?backoff, "cannot reach bus relay");
            }
        }

        // 断开期间积压的消息无法保证送达，直接丢弃
        while outbound_rx.try_recv().is_ok() {}
        if outbound_rx.is_closed() {
            return;
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn pump(
    stream: TcpStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<BusEnvelope>,
    inbound_tx: &broadcast::Sender<BusEnvelope>,
) -> Result<LinkEnd, BusError> {
    let mut framed = Framed::new(stream, frame_codec());

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => {
                let Some(envelope) = outgoing else {
                    return Ok(LinkEnd::Shutdown);
                };
                let frame = serde_json::to_vec(&envelope)?;
                framed.send(Bytes::from(frame)).await?;
            }
            incoming = framed.next() => {
                match incoming {
                    Some(Ok(buf)) => match serde_json::from_slice::<BusEnvelope>(&buf) {
                        Ok(envelope) => {
                            // 没有订阅者时发送失败是正常现象
                            let _ = inbound_tx.send(envelope);
                        }
                        Err(e) => {
                            METRICS.bus_errors_total.with_label_values(&["decode"]).inc();
                            warn!(error = %e, "dropping undecodable bus frame");
                        }
                    },
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(LinkEnd::Closed),
                }
            }
        }
    }
}
