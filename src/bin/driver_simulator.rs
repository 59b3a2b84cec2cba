use clap::Parser;
use dispatch_hub::infrastructure::transport::frame_codec;
use dispatch_hub::shared::protocol::{Envelope, EVENT_CONNECTED, EVENT_DRIVER_INFO, EVENT_NEW_BOOKING};
use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// 模拟司机：连接到调度中心，周期性上报位置，统计收到的订单
#[derive(Parser, Debug)]
#[command(name = "driver-simulator")]
struct Args {
    /// 司机接入地址
    #[arg(long, default_value = "127.0.0.1:4001")]
    addr: SocketAddr,

    /// 模拟司机数量
    #[arg(short = 'n', long, default_value_t = 8)]
    drivers: u32,

    /// 测试持续时间（秒）
    #[arg(short, long, default_value_t = 10)]
    duration_secs: u64,

    /// 位置中心点经度
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lon: f64,

    /// 位置中心点纬度
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    lat: f64,

    /// 位置随机偏移范围（度）
    #[arg(long, default_value_t = 1.0)]
    spread: f64,

    /// 车型
    #[arg(long, default_value = "sedan")]
    vehicle_type: String,

    /// 上报间隔（毫秒）
    #[arg(long, default_value_t = 1000)]
    report_interval_ms: u64,
}

#[derive(Default)]
struct Counters {
    connected: AtomicU64,
    reports: AtomicU64,
    bookings: AtomicU64,
}

#[tokio::main]
async fn main() {
    let args = Arc::new(Args::parse());
    println!("启动司机模拟...");
    println!("目标地址: {}", args.addr);
    println!("模拟司机数量: {}", args.drivers);
    println!("测试持续时间: {}s", args.duration_secs);

    let counters = Arc::new(Counters::default());

    for i in 0..args.drivers {
        let args = args.clone();
        let counters = counters.clone();
        tokio::spawn(async move {
            run_driver(i, args, counters).await;
        });
    }

    let duration = Duration::from_secs(args.duration_secs);
    tokio::time::sleep(duration).await;

    let bookings = counters.bookings.load(Ordering::Relaxed);
    println!("\n--- 模拟结果 ---");
    println!("已连接司机: {}", counters.connected.load(Ordering::Relaxed));
    println!("位置上报次数: {}", counters.reports.load(Ordering::Relaxed));
    println!("收到订单总数: {}", bookings);
    println!("订单接收速率: {:.2}/s", bookings as f64 / duration.as_secs_f64());

    // 直接退出，不等待各司机任务结束
    std::process::exit(0);
}

async fn run_driver(driver_no: u32, args: Arc<Args>, counters: Arc<Counters>) {
    let stream = match TcpStream::connect(args.addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[司机 {}] 连接失败: {}", driver_no, e);
            return;
        }
    };
    let mut framed = Framed::new(stream, frame_codec());
    let mut interval = tokio::time::interval(Duration::from_millis(args.report_interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = Envelope::new(EVENT_DRIVER_INFO, json!({
                    "driverId": format!("sim-{}", driver_no),
                    "location": { "coordinates": random_position(&args) },
                    "vehicleType": args.vehicle_type,
                    "status": "available"
                }));
                let frame = match report.encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        eprintln!("[司机 {}] 编码失败: {}", driver_no, e);
                        return;
                    }
                };
                if framed.send(frame).await.is_err() {
                    eprintln!("[司机 {}] 连接已断开", driver_no);
                    return;
                }
                counters.reports.fetch_add(1, Ordering::Relaxed);
            }
            inbound = framed.next() => {
                let Some(Ok(buf)) = inbound else {
                    eprintln!("[司机 {}] 连接已断开", driver_no);
                    return;
                };
                match Envelope::decode(&buf) {
                    Ok(envelope) if envelope.event == EVENT_CONNECTED => {
                        counters.connected.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(envelope) if envelope.event == EVENT_NEW_BOOKING => {
                        counters.bookings.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(e) => eprintln!("[司机 {}] 无法解析的帧: {}", driver_no, e),
                }
            }
        }
    }
}

fn random_position(args: &Args) -> [f64; 2] {
    let mut rng = rand::thread_rng();
    let spread = args.spread.abs();
    if spread == 0.0 {
        return [args.lon, args.lat];
    }
    let lon = args.lon + rng.gen_range(-spread..=spread);
    let lat = (args.lat + rng.gen_range(-spread..=spread)).clamp(-90.0, 90.0);
    [lon, lat]
}
