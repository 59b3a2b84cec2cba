/// CLI Interface Module
///
/// Entry point for the `dispatch-hub` binary.
///
/// ## Responsibilities
/// - Parse command-line arguments (flags, with env fallbacks)
/// - Initialize logging
/// - Wire the registry, engine, connection hub and cluster bridge
/// - Run the driver transport and the HTTP server, or the bus relay

use crate::application::services::DispatchEngine;
use crate::application::use_cases::DispatchBookingUseCase;
use crate::domain::{DriverRegistry, EligibilityFilter, MatchPolicy, VehicleTypeMatch};
use crate::infrastructure::cluster::{BusRelay, ClusterBridge, ClusterBus, InMemoryBus, TcpBus};
use crate::infrastructure::observability::{HealthChecker, ObservabilityState};
use crate::infrastructure::transport::{ConnectionHub, DriverServer};
use crate::interfaces::http;
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 进程角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// 接入司机并调度订单
    Hub,
    /// 集群总线中继
    Relay,
}

/// 调度中心命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "dispatch-hub")]
#[command(version)]
#[command(about = "实时司机调度中心", long_about = None)]
pub struct CliConfig {
    /// 监听地址
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// HTTP 端口（/emit、/health、/metrics）
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// 司机 TCP 接入端口
    #[arg(short = 'd', long, env = "DRIVER_PORT", default_value_t = 4001)]
    pub driver_port: u16,

    /// 进程角色
    #[arg(short, long, value_enum, default_value_t = Role::Hub)]
    pub role: Role,

    /// 总线中继地址（hub：连接目标；relay：监听地址）。hub 未指定时为单实例模式
    #[arg(short, long, env = "BUS_ADDR")]
    pub bus_addr: Option<SocketAddr>,

    /// 实例ID，用作连接ID前缀和总线消息来源（默认随机生成）
    #[arg(long, env = "INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// 车型匹配方式
    #[arg(long, default_value = "exact", value_parser = parse_vehicle_type_match)]
    pub vehicle_type_match: VehicleTypeMatch,

    /// 日志级别
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// 仅显示配置不启动服务器（用于调试）
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

fn parse_vehicle_type_match(s: &str) -> Result<VehicleTypeMatch, String> {
    s.parse()
}

impl CliConfig {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn driver_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.driver_port)
    }

    /// 配置的实例ID，或新生成的随机ID
    pub fn resolve_instance_id(&self) -> String {
        match &self.instance_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{:08x}", rand::random::<u32>()),
        }
    }
}

/// Runs the CLI application
///
/// Parses command-line arguments and runs until the servers stop or Ctrl-C.
pub async fn run() {
    let config = CliConfig::parse();

    init_logging(&config.log_level);

    print_banner(&config);
    if config.dry_run {
        println!("\nDry-run 模式 - 不启动服务器");
        return;
    }

    if let Err(e) = start(config).await {
        error!(error = %e, "dispatch hub stopped with an error");
        std::process::exit(1);
    }
}

/// 按角色启动服务
pub async fn start(config: CliConfig) -> Result<(), BoxError> {
    match config.role {
        Role::Hub => run_hub(config).await,
        Role::Relay => run_relay(config).await,
    }
}

async fn run_hub(config: CliConfig) -> Result<(), BoxError> {
    let instance_id = config.resolve_instance_id();
    let health = Arc::new(HealthChecker::default());
    let hub = Arc::new(ConnectionHub::new(instance_id.as_str()));
    info!(instance = %instance_id, session = hub.session_id(), "starting dispatch hub");
    let bus: Arc<dyn ClusterBus> = match config.bus_addr {
        Some(addr) => TcpBus::connect(addr),
        None => {
            info!("no bus address configured, running as a single instance");
            Arc::new(InMemoryBus::default())
        }
    };

    let bridge = Arc::new(ClusterBridge::new(hub.clone(), bus.clone(), health.clone()));
    let registry = Arc::new(DriverRegistry::new());
    let filter = EligibilityFilter::with_policy(MatchPolicy {
        vehicle_type_match: config.vehicle_type_match,
        ..MatchPolicy::default()
    });
    let engine = Arc::new(DispatchEngine::new(registry.clone(), filter, bridge.clone()));
    let bridge_task = bridge.start(engine.clone());

    let use_case = Arc::new(DispatchBookingUseCase::new(engine.clone(), bridge.clone()));
    let app = http::router(
        use_case,
        ObservabilityState {
            health,
            hub: hub.clone(),
            registry,
            bus,
        },
    );

    let driver_server = DriverServer::bind(config.driver_addr(), engine, hub).await?;
    let listener = tokio::net::TcpListener::bind(config.http_addr()).await?;
    info!(addr = %config.http_addr(), "http server listening");

    tokio::select! {
        result = driver_server.run() => result?,
        result = async { axum::serve(listener, app).await } => result?,
        _ = bridge_task => warn!("cluster bridge stopped"),
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    Ok(())
}

async fn run_relay(config: CliConfig) -> Result<(), BoxError> {
    let addr = config
        .bus_addr
        .ok_or("--bus-addr is required for the relay role")?;
    let relay = BusRelay::bind(addr).await?;

    tokio::select! {
        result = relay.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    Ok(())
}

fn print_banner(config: &CliConfig) {
    println!("========================================");
    println!("  实时司机调度中心 v{}", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("角色:         {:?}", config.role);
    match config.role {
        Role::Hub => {
            println!("HTTP地址:     {}", config.http_addr());
            println!("司机接入:     {}", config.driver_addr());
            match config.bus_addr {
                Some(addr) => println!("总线中继:     {}", addr),
                None => println!("总线中继:     无（单实例）"),
            }
            println!("车型匹配:     {:?}", config.vehicle_type_match);
        }
        Role::Relay => match config.bus_addr {
            Some(addr) => println!("中继监听:     {}", addr),
            None => println!("中继监听:     未配置"),
        },
    }
    println!("日志级别:     {}", config.log_level);
    println!("========================================");
}

/// 初始化日志系统（RUST_LOG 优先）
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
