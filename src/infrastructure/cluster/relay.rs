// 总线中继
//
// 每个 hub 实例通过 `TcpBus` 连接到中继；任一实例发来的帧原样广播给
// 所有已连接的实例（包括发送者）。中继不解析消息内容。

use crate::infrastructure::transport::codec::frame_codec;
use crate::infrastructure::transport::listener::accept_next;
use crate::shared::error::TransportError;
use crate::shared::metrics::METRICS;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

const RELAY_CAPACITY: usize = 4096;

pub struct BusRelay {
    listener: TcpListener,
    broadcast_tx: broadcast::Sender<Bytes>,
}

impl BusRelay {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let (broadcast_tx, _) = broadcast::channel(RELAY_CAPACITY);
        Ok(Self {
            listener,
            broadcast_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<(), TransportError> {
        info!(addr = %self.local_addr()?, "bus relay listening");

        loop {
            let (stream, peer) = accept_next(&self.listener, "relay").await;
            let broadcast_tx = self.broadcast_tx.clone();
            let broadcast_rx = self.broadcast_tx.subscribe();

            tokio::spawn(async move {
                handle_peer(stream, peer, broadcast_tx, broadcast_rx).await;
            });
        }
    }
}

// 处理单个 hub 实例的连接
async fn handle_peer(
    stream: TcpStream,
    peer: SocketAddr,
    broadcast_tx: broadcast::Sender<Bytes>,
    mut broadcast_rx: broadcast::Receiver<Bytes>,
) {
    info!(%peer, "hub instance joined the bus");
    let mut framed = Framed::new(stream, frame_codec());

    loop {
        tokio::select! {
            inbound = framed.next() => {
                match inbound {
                    Some(Ok(buf)) => {
                        METRICS.bus_messages_total.with_label_values(&["relayed", "frame"]).inc();
                        // 没有其他订阅者时发送失败是正常现象
                        let _ = broadcast_tx.send(buf.freeze());
                    }
                    Some(Err(e)) => {
                        debug!(%peer, error = %e, "read error on bus link");
                        break;
                    }
                    None => break,
                }
            }
            outbound = broadcast_rx.recv() => {
                match outbound {
                    Ok(frame) => {
                        if let Err(e) = framed.send(frame).await {
                            debug!(%peer, error = %e, "write error on bus link");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        METRICS.bus_errors_total.with_label_values(&["lagged"]).inc();
                        warn!(%peer, skipped, "bus peer lagging, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!(%peer, "hub instance left the bus");
}
