//! Prometheus Metrics Module
//!
//! 提供调度中心的核心运行指标
//!
//! ## 指标类型
//! - **Counter**: 调度次数、匹配司机数、推送失败、总线消息
//! - **Histogram**: 调度耗时
//! - **Gauge**: 在线连接数、注册司机数
//!
//! ## 使用示例
//! ```rust,ignore
//! use dispatch_hub::shared::metrics::METRICS;
//!
//! METRICS.dispatches_total.with_label_values(&["matched"]).inc();
//!
//! let timer = METRICS.dispatch_duration.with_label_values(&["local"]).start_timer();
//! // ... 执行调度 ...
//! timer.observe_duration();
//! ```

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// 全局Metrics实例
    pub static ref METRICS: Metrics = Metrics::new();
}

/// 调度中心核心指标
pub struct Metrics {
    /// 调度总数 (按结果: matched/unmatched/malformed)
    pub dispatches_total: CounterVec,

    /// 匹配到的司机总数 (按来源: local/relayed)
    pub drivers_matched_total: CounterVec,

    /// 推送失败总数 (按原因)
    pub emit_failures_total: CounterVec,

    /// 调度耗时分布 (秒)
    pub dispatch_duration: HistogramVec,

    /// 司机状态事件 (insert/update/remove/rejected)
    pub presence_events_total: CounterVec,

    /// 当前注册的司机数
    pub registered_drivers: IntGauge,

    /// 活跃连接数
    pub active_connections: IntGauge,

    /// 总线消息数 (按方向与类型)
    pub bus_messages_total: CounterVec,

    /// 总线错误数 (按类型)
    pub bus_errors_total: CounterVec,

    /// accept 失败次数 (按监听器: driver/relay)
    pub accept_errors_total: CounterVec,
}

impl Metrics {
    /// 创建新的Metrics实例
    pub fn new() -> Self {
        Self {
            dispatches_total: register_counter_vec!(
                "dispatch_hub_dispatches_total",
                "Total number of booking dispatch passes",
                &["outcome"]
            )
            .expect("dispatches_total registers once"),

            drivers_matched_total: register_counter_vec!(
                "dispatch_hub_drivers_matched_total",
                "Total number of drivers matched by dispatch passes",
                &["origin"]
            )
            .expect("drivers_matched_total registers once"),

            emit_failures_total: register_counter_vec!(
                "dispatch_hub_emit_failures_total",
                "Total number of events that could not be delivered to a connection",
                &["reason"]
            )
            .expect("emit_failures_total registers once"),

            dispatch_duration: register_histogram_vec!(
                "dispatch_hub_dispatch_duration_seconds",
                "Duration of a single dispatch pass",
                &["origin"],
                vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]
            )
            .expect("dispatch_duration registers once"),

            presence_events_total: register_counter_vec!(
                "dispatch_hub_presence_events_total",
                "Total number of presence registry changes",
                &["event"]
            )
            .expect("presence_events_total registers once"),

            registered_drivers: register_int_gauge!(
                "dispatch_hub_registered_drivers",
                "Number of drivers currently held in the local presence registry"
            )
            .expect("registered_drivers registers once"),

            active_connections: register_int_gauge!(
                "dispatch_hub_active_connections",
                "Number of open driver connections on this instance"
            )
            .expect("active_connections registers once"),

            bus_messages_total: register_counter_vec!(
                "dispatch_hub_bus_messages_total",
                "Total number of cluster bus messages",
                &["direction", "kind"]
            )
            .expect("bus_messages_total registers once"),

            bus_errors_total: register_counter_vec!(
                "dispatch_hub_bus_errors_total",
                "Total number of cluster bus failures",
                &["error_type"]
            )
            .expect("bus_errors_total registers once"),

            accept_errors_total: register_counter_vec!(
                "dispatch_hub_accept_errors_total",
                "Total number of failed accepts on a listening socket",
                &["listener"]
            )
            .expect("accept_errors_total registers once"),
        }
    }

    /// 导出Prometheus格式的指标
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_global() {
        // 使用全局METRICS实例而不是创建新的
        METRICS.dispatches_total.with_label_values(&["matched"]).inc();

        let output = METRICS.export();
        assert!(output.contains("dispatch_hub_dispatches_total"));
    }

    #[test]
    fn test_histogram_global() {
        METRICS
            .dispatch_duration
            .with_label_values(&["local"])
            .observe(0.0002);

        let output = METRICS.export();
        assert!(output.contains("dispatch_hub_dispatch_duration_seconds"));
    }

    #[test]
    fn test_gauge_global() {
        METRICS.registered_drivers.set(3);

        // Note: 由于是全局共享，不能假设值精确匹配
        let output = METRICS.export();
        assert!(output.contains("dispatch_hub_registered_drivers"));
    }
}
