// 全局内存分配器：使用 jemalloc
// 大量短生命周期的帧缓冲和快照 Vec，jemalloc 在高并发下表现更稳定
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// 分层结构：shared ← domain ← application ← infrastructure ← interfaces
pub mod shared;
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod interfaces;
