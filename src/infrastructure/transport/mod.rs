/// Driver transport
///
/// 司机设备通过持久 TCP 连接接入，帧格式见 `codec`
///
/// - `hub`: 本实例持有的连接及其出站队列
/// - `server`: 接受连接并把事件路由到调度引擎
/// - `codec`: 长度前缀分帧配置
/// - `listener`: 容错的 accept 循环

pub mod codec;
pub mod hub;
pub mod listener;
pub mod server;

pub use codec::{frame_codec, MAX_FRAME_LEN};
pub use hub::ConnectionHub;
pub use listener::accept_next;
pub use server::DriverServer;
