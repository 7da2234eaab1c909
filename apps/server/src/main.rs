//! 插座对接服务主入口
//!
//! 启动顺序：配置 → 日志 → 执行器连接 → 监听端口 → 处理循环。

mod hub;
mod server;
mod session;

use anyhow::Context;
use clap::Parser;
use dock_actuator::{ActuatorTransport, TcpActuator};
use dock_orchestrator::{EnvelopeRouter, Orchestrator};
use dock_planner::MotionPlanner;
use dock_tools::{DockConfig, init_logging};
use hub::ChannelHub;
use server::Server;
use session::Inbound;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 插座对接服务
///
/// 连接机械臂执行器，通过 TCP JSON 行协议接收命令与视觉结果
#[derive(Parser, Debug)]
#[command(name = "dock-server")]
#[command(about = "Socket docking server - JSON lines over TCP", long_about = None)]
struct Args {
    /// 配置文件路径（TOML）
    ///
    /// `DOCK__SECTION__KEY` 环境变量覆盖文件中的值
    #[arg(short, long, default_value = dock_tools::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// 配置文件不存在时使用默认值
    #[arg(long)]
    allow_missing_config: bool,

    /// 覆盖监听端口
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if args.allow_missing_config {
        DockConfig::load_or_default(&args.config, std::env::vars())
    } else {
        DockConfig::load(&args.config)
    }
    .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _guard = init_logging(&config.logging).context("Failed to initialize logging")?;
    info!("dock-server {} starting", env!("CARGO_PKG_VERSION"));

    // 1. 执行器：连不上就没有可服务的内容
    let robot_addr = config.robot.addr();
    let actuator = match TcpActuator::connect(&robot_addr, config.robot.timeout()) {
        Ok(actuator) => actuator,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };
    info!("Connected to actuator at {}", robot_addr);

    // 2. 组装处理链
    let hub = Arc::new(ChannelHub::new());
    let planner = MotionPlanner::new(
        Box::new(actuator) as Box<dyn ActuatorTransport>,
        hub.clone(),
        config.robot.initial_state(),
        config.motion,
    )
    .with_home_tolerance(config.robot.home_tolerance);
    let router = EnvelopeRouter::new(Orchestrator::new(planner, hub.clone()));
    let server = Server::new(router, hub);

    // 3. Ctrl+C 让处理循环在当前原语结束后退出
    let inbox = server.inbox();
    ctrlc::set_handler(move || {
        warn!("Received interrupt signal, shutting down");
        let _ = inbox.send(Inbound::Shutdown);
    })
    .context("Failed to set signal handler")?;

    let bind_addr = config.server.bind_addr();
    let listener =
        TcpListener::bind(&bind_addr).with_context(|| format!("Failed to bind {}", bind_addr))?;
    server.run(listener).context("Server error")?;

    info!("dock-server stopped");
    Ok(())
}
