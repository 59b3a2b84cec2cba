/// Cluster layer
///
/// 多实例部署时，各实例通过总线互相转发订单：
/// - `bus`: 总线契约与进程内实现
/// - `tcp_bus`: 连接到中继的总线客户端
/// - `relay`: 帧广播中继（`--role relay`）
/// - `bridge`: 把总线接到本实例的调度引擎和连接中心

pub mod bus;
pub mod tcp_bus;
pub mod relay;
pub mod bridge;

pub use bridge::{ClusterBridge, DEDUP_WINDOW};
pub use bus::{BusEnvelope, BusMessage, ClusterBus, InMemoryBus, BUS_CAPACITY};
pub use relay::BusRelay;
pub use tcp_bus::TcpBus;
