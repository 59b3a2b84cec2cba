//! Health Check
//!
//! 提供 hub 健康状态，用于负载均衡器和监控系统
//!
//! ## 状态
//! - `healthy` - 正常
//! - `degraded` - 集群总线不可用，仅本地调度；仍然接受流量
//! - `unhealthy` - 不应再接收流量
//!
//! ## 响应格式
//! ```json
//! {
//!   "status": "healthy",
//!   "uptime_seconds": 3600,
//!   "version": "0.1.0",
//!   "timestamp": 1234567890,
//!   "details": {
//!     "active_connections": 12,
//!     "registered_drivers": 9,
//!     "bus_available": true
//!   }
//! }
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// 降级（总线不可用）
    Degraded,
    Unhealthy,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// 详细健康信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    /// 本实例持有的司机连接数
    pub active_connections: usize,
    /// 本实例注册表中的司机数
    pub registered_drivers: usize,
    /// 集群总线是否可用
    pub bus_available: bool,
}

/// 健康检查器
pub struct HealthChecker {
    start_time: SystemTime,
    status: RwLock<HealthStatus>,
    version: String,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            start_time: SystemTime::now(),
            status: RwLock::new(HealthStatus::Healthy),
            version: version.into(),
        }
    }

    /// 运行时间（秒）
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().map(|d| d.as_secs()).unwrap_or(0)
    }

    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn set_status(&self, status: HealthStatus) {
        *self.status.write() = status;
    }

    pub fn get_status(&self) -> HealthStatus {
        *self.status.read()
    }

    /// Healthy → Degraded；返回是否发生了状态变化
    pub fn degrade(&self) -> bool {
        let mut status = self.status.write();
        if *status == HealthStatus::Healthy {
            *status = HealthStatus::Degraded;
            true
        } else {
            false
        }
    }

    /// Degraded → Healthy；Unhealthy 不会被自动恢复
    pub fn recover(&self) -> bool {
        let mut status = self.status.write();
        if *status == HealthStatus::Degraded {
            *status = HealthStatus::Healthy;
            true
        } else {
            false
        }
    }

    pub fn check_health(&self) -> HealthResponse {
        HealthResponse {
            status: self.get_status(),
            uptime_seconds: self.uptime_seconds(),
            version: self.version.clone(),
            timestamp: Self::current_timestamp(),
            details: None,
        }
    }

    pub fn check_health_detailed(&self, details: HealthDetails) -> HealthResponse {
        HealthResponse {
            details: Some(details),
            ..self.check_health()
        }
    }

    /// 存活检查（liveness probe）
    pub fn check_liveness(&self) -> bool {
        true
    }

    /// 就绪检查（readiness probe）
    ///
    /// 降级状态仍然可以接受流量：本地调度不依赖总线
    pub fn check_readiness(&self) -> bool {
        self.get_status() != HealthStatus::Unhealthy
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_checker_creation() {
        let checker = HealthChecker::new("1.0.0");
        assert_eq!(checker.version, "1.0.0");
        assert_eq!(checker.get_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_degrade_and_recover() {
        let checker = HealthChecker::new("1.0.0");

        assert!(checker.degrade());
        assert!(!checker.degrade());
        assert_eq!(checker.get_status(), HealthStatus::Degraded);

        assert!(checker.recover());
        assert!(!checker.recover());
        assert_eq!(checker.get_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_recover_leaves_unhealthy_alone() {
        let checker = HealthChecker::new("1.0.0");
        checker.set_status(HealthStatus::Unhealthy);

        assert!(!checker.degrade());
        assert!(!checker.recover());
        assert_eq!(checker.get_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_response_detailed() {
        let checker = HealthChecker::new("1.0.0");
        let details = HealthDetails {
            active_connections: 10,
            registered_drivers: 7,
            bus_available: true,
        };

        let response = checker.check_health_detailed(details.clone());
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.version, "1.0.0");
        assert!(response.timestamp > 0);
        assert_eq!(response.details, Some(details));
    }

    #[test]
    fn test_liveness_probe() {
        let checker = HealthChecker::new("1.0.0");
        assert!(checker.check_liveness());

        // 即使状态不健康，存活检查也应该通过
        checker.set_status(HealthStatus::Unhealthy);
        assert!(checker.check_liveness());
    }

    #[test]
    fn test_readiness_probe() {
        let checker = HealthChecker::new("1.0.0");
        assert!(checker.check_readiness());

        checker.set_status(HealthStatus::Degraded);
        assert!(checker.check_readiness());

        checker.set_status(HealthStatus::Unhealthy);
        assert!(!checker.check_readiness());
    }

    #[test]
    fn test_serialization() {
        let response = HealthChecker::new("1.0.0").check_health_detailed(HealthDetails {
            active_connections: 3,
            registered_drivers: 2,
            bus_available: false,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["details"]["bus_available"], false);
        assert_eq!(json["details"]["registered_drivers"], 2);
    }
}
