//! HTTP Observability Routes
//!
//! 提供Prometheus metrics和健康检查端点
//!
//! ## 端点
//! - `GET /metrics` - Prometheus格式的指标
//! - `GET /health` - 健康检查（含连接数、司机数、总线状态）
//! - `GET /health/ready` - 就绪检查
//! - `GET /health/live` - 存活检查
//!
//! 路由与 `/emit` 共用同一个 HTTP 端口，见 `interfaces::http`。
//!
//! ## 使用示例
//! ```rust,ignore
//! let app = observability_router(ObservabilityState { health, hub, registry, bus });
//! axum::serve(listener, app).await?;
//! ```

use super::health::{HealthChecker, HealthDetails, HealthStatus};
use crate::domain::registry::DriverRegistry;
use crate::infrastructure::cluster::bus::ClusterBus;
use crate::infrastructure::transport::hub::ConnectionHub;
use crate::shared::metrics::METRICS;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// 可观测性端点共享状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub health: Arc<HealthChecker>,
    pub hub: Arc<ConnectionHub>,
    pub registry: Arc<DriverRegistry>,
    pub bus: Arc<dyn ClusterBus>,
}

impl ObservabilityState {
    fn details(&self) -> HealthDetails {
        HealthDetails {
            active_connections: self.hub.len(),
            registered_drivers: self.registry.len(),
            bus_available: self.bus.is_available(),
        }
    }
}

/// 构建可观测性路由
pub fn observability_router(state: ObservabilityState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(state)
}

/// Prometheus metrics端点
async fn metrics_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export(),
    )
        .into_response()
}

/// 健康检查端点
async fn health_handler(State(state): State<ObservabilityState>) -> Response {
    let response = state.health.check_health_detailed(state.details());

    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response)).into_response()
}

/// 就绪检查端点（用于Kubernetes readiness probe）
async fn readiness_handler(State(state): State<ObservabilityState>) -> StatusCode {
    if state.health.check_readiness() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// 存活检查端点（用于Kubernetes liveness probe）
async fn liveness_handler(State(state): State<ObservabilityState>) -> StatusCode {
    if state.health.check_liveness() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cluster::bus::InMemoryBus;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> (ObservabilityState, Arc<InMemoryBus>) {
        let bus = Arc::new(InMemoryBus::default());
        let state = ObservabilityState {
            health: Arc::new(HealthChecker::new("1.0.0")),
            hub: Arc::new(ConnectionHub::new("node-a")),
            registry: Arc::new(DriverRegistry::new()),
            bus: bus.clone(),
        };
        (state, bus)
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health_reports_details() {
        let (state, bus) = state();
        let (_id, _rx) = state.hub.register();
        bus.set_available(false);

        let (status, body) = get_path(observability_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["details"]["active_connections"], 1);
        assert_eq!(json["details"]["registered_drivers"], 0);
        assert_eq!(json["details"]["bus_available"], false);
    }

    #[tokio::test]
    async fn test_readiness_follows_status() {
        let (state, _bus) = state();
        let app = observability_router(state.clone());

        state.health.set_status(HealthStatus::Degraded);
        let (status, _) = get_path(app.clone(), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);

        state.health.set_status(HealthStatus::Unhealthy);
        let (status, _) = get_path(app.clone(), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get_path(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get_path(app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (state, _bus) = state();
        METRICS.dispatches_total.with_label_values(&["matched"]).inc();

        let (status, body) = get_path(observability_router(state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("dispatch_hub_dispatches_total"));
    }
}
