/// Connection Hub - Live driver connections held by this instance
///
/// Each accepted connection registers an unbounded outbound channel; the
/// connection task drains it onto the socket. Emitting is therefore a
/// non-blocking channel send, and a slow socket never stalls a dispatch pass.
///
/// Ids are scoped by a session id, `<instance-id>-<boot nonce>`, drawn fresh
/// on every start. A restarted process that keeps its configured instance id
/// therefore never reissues a connection id or a bus message id.

use crate::application::ports::EventEmitter;
use crate::shared::error::EmitError;
use crate::shared::protocol::{ConnectionId, OutboundEvent};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct ConnectionHub {
    instance_id: Arc<str>,
    session_id: Arc<str>,
    next_conn_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Bytes>>>,
}

impl ConnectionHub {
    pub fn new(instance_id: impl Into<Arc<str>>) -> Self {
        let instance_id: Arc<str> = instance_id.into();
        let session_id = Arc::from(format!("{}-{:08x}", instance_id, rand::random::<u32>()));
        Self {
            instance_id,
            session_id,
            next_conn_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Instance id plus this process's boot nonce
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Allocates a cluster-unique connection id and its outbound queue
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Bytes>) {
        let seq = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let id = ConnectionId::from(format!("{}-{}", self.session_id, seq));
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().insert(id.clone(), tx);
        (id, rx)
    }

    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        self.connections.write().remove(connection_id).is_some()
    }

    pub fn holds(&self, connection_id: &ConnectionId) -> bool {
        self.connections.read().contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Queues a raw frame for one connection
    pub fn send_frame(&self, connection_id: &ConnectionId, frame: Bytes) -> Result<(), EmitError> {
        let connections = self.connections.read();
        let tx = connections
            .get(connection_id)
            .ok_or_else(|| EmitError::UnknownConnection(connection_id.clone()))?;
        tx.send(frame)
            .map_err(|_| EmitError::ConnectionClosed(connection_id.clone()))
    }
}

impl EventEmitter for ConnectionHub {
    fn emit(&self, target: &ConnectionId, event: &OutboundEvent) -> Result<(), EmitError> {
        self.send_frame(target, event.frame().clone())
    }
}
