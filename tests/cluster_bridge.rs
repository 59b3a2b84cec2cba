use dispatch_hub::application::services::DispatchEngine;
use dispatch_hub::application::use_cases::{DispatchBookingUseCase, DispatchOutcome};
use dispatch_hub::domain::{Booking, DriverRegistry, EligibilityFilter};
use dispatch_hub::infrastructure::cluster::{BusRelay, ClusterBridge, ClusterBus, InMemoryBus, TcpBus};
use dispatch_hub::infrastructure::observability::{HealthChecker, HealthStatus};
use dispatch_hub::infrastructure::transport::ConnectionHub;
use dispatch_hub::shared::protocol::{Envelope, EVENT_NEW_BOOKING};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

type Engine = DispatchEngine<Arc<ClusterBridge>>;

struct Instance {
    hub: Arc<ConnectionHub>,
    engine: Arc<Engine>,
    health: Arc<HealthChecker>,
    use_case: DispatchBookingUseCase<Arc<ClusterBridge>, Arc<ClusterBridge>>,
}

fn instance(id: &str, bus: Arc<dyn ClusterBus>) -> Instance {
    let hub = Arc::new(ConnectionHub::new(id));
    let health = Arc::new(HealthChecker::default());
    let bridge = Arc::new(ClusterBridge::new(hub.clone(), bus, health.clone()));
    let engine = Arc::new(DispatchEngine::new(
        Arc::new(DriverRegistry::new()),
        EligibilityFilter::new(),
        bridge.clone(),
    ));
    bridge.start(engine.clone());
    let use_case = DispatchBookingUseCase::new(engine.clone(), bridge);
    Instance {
        hub,
        engine,
        health,
        use_case,
    }
}

fn attach_driver(instance: &Instance, lon: f64, lat: f64) -> UnboundedReceiver<Bytes> {
    let (id, rx) = instance.hub.register();
    instance
        .engine
        .on_presence_report(&id, json!({
            "location": { "coordinates": [lon, lat] },
            "vehicleType": "sedan",
            "status": "available"
        }))
        .unwrap();
    rx
}

fn booking() -> Booking {
    Booking::new(json!({
        "bookingId": "b-cluster",
        "pickupLocation": { "coordinates": [0.0, 0.0] },
        "vehicleType": "sedan"
    }))
}

async fn next_offer(rx: &mut UnboundedReceiver<Bytes>) -> Envelope {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for booking")
        .expect("connection queue closed");
    Envelope::decode(&frame).unwrap()
}

async fn assert_silent(rx: &mut UnboundedReceiver<Bytes>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "unexpected extra frame");
}

#[tokio::test]
async fn test_booking_reaches_driver_on_other_instance() {
    let bus: Arc<dyn ClusterBus> = Arc::new(InMemoryBus::default());
    let a = instance("node-a", bus.clone());
    let b = instance("node-b", bus);

    let mut local = attach_driver(&a, 0.0, 0.0);
    let mut remote = attach_driver(&b, 0.2, 0.2);

    let outcome = a.use_case.execute(&booking());
    // 返回值只计本实例匹配到的司机
    assert_eq!(outcome, DispatchOutcome { matched: 1, relayed: true });

    assert_eq!(next_offer(&mut local).await.event, EVENT_NEW_BOOKING);
    let offer = next_offer(&mut remote).await;
    assert_eq!(offer.data["bookingId"], "b-cluster");

    // 自己发布的消息不会被重复调度
    assert_silent(&mut local).await;
    assert_silent(&mut remote).await;
}

#[tokio::test]
async fn test_remote_instance_filters_by_its_own_registry() {
    let bus: Arc<dyn ClusterBus> = Arc::new(InMemoryBus::default());
    let a = instance("node-a", bus.clone());
    let b = instance("node-b", bus);

    let mut far_away = attach_driver(&b, 50.0, 50.0);

    let outcome = a.use_case.execute(&booking());
    assert_eq!(outcome.matched, 0);
    assert_silent(&mut far_away).await;
}

#[tokio::test]
async fn test_bus_outage_falls_back_to_local_dispatch() {
    let bus = Arc::new(InMemoryBus::default());
    let a = instance("node-a", bus.clone());
    let b = instance("node-b", bus.clone());

    let mut local = attach_driver(&a, 0.0, 0.0);
    let mut remote = attach_driver(&b, 0.0, 0.0);

    bus.set_available(false);
    let outcome = a.use_case.execute(&booking());

    assert_eq!(outcome, DispatchOutcome { matched: 1, relayed: false });
    assert_eq!(a.health.get_status(), HealthStatus::Degraded);
    assert!(a.health.check_readiness());
    assert_eq!(next_offer(&mut local).await.event, EVENT_NEW_BOOKING);
    assert_silent(&mut remote).await;

    bus.set_available(true);
    assert!(a.use_case.execute(&booking()).relayed);
    assert_eq!(a.health.get_status(), HealthStatus::Healthy);
    assert_eq!(next_offer(&mut remote).await.event, EVENT_NEW_BOOKING);
}

async fn wait_connected(bus: &TcpBus) {
    for _ in 0..500 {
        if bus.is_available() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("bus never connected to relay");
}

#[tokio::test]
async fn test_instances_share_bookings_over_tcp_relay() {
    let relay = BusRelay::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let relay_addr = relay.local_addr().unwrap();
    tokio::spawn(relay.run());

    let bus_a = TcpBus::connect(relay_addr);
    let bus_b = TcpBus::connect(relay_addr);
    wait_connected(&bus_a).await;
    wait_connected(&bus_b).await;
    // 等待中继为两个连接完成订阅
    tokio::time::sleep(Duration::from_millis(100)).await;

    let a = instance("node-a", bus_a);
    let b = instance("node-b", bus_b);
    let mut remote = attach_driver(&b, 0.0, 0.0);

    let outcome = a.use_case.execute(&booking());
    assert_eq!(outcome, DispatchOutcome { matched: 0, relayed: true });

    let offer = next_offer(&mut remote).await;
    assert_eq!(offer.event, EVENT_NEW_BOOKING);
    assert_eq!(offer.data["bookingId"], "b-cluster");
    assert_silent(&mut remote).await;
}
