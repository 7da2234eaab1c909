//! # Dock CLI
//!
//! 插座对接服务的操作员客户端与视觉桥接。
//!
//! ```bash
//! # 完整对接流程（复位 → 拍照 → 接近 → 插入）
//! dock-cli --server 127.0.0.1:4444 plug-in --target 0
//!
//! # 拔出并回到初始位置
//! dock-cli plug-out
//!
//! # 查询服务端状态
//! dock-cli status
//!
//! # 调试：发送任意信封
//! dock-cli send --kind msg --topic safety_detection --data '{"result": 0, "message": "person"}'
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dock_protocol::{Envelope, notice};
use serde_json::Map;
use std::time::Duration;

mod client;
mod commands;
mod vision;

use client::DockClient;
use commands::{PlugInCommand, SendCommand, await_notice, await_pose};

/// Dock CLI - 插座对接命令行工具
#[derive(Parser, Debug)]
#[command(name = "dock-cli")]
#[command(about = "Operator client and vision bridge for the socket docking server", long_about = None)]
#[command(version)]
struct Cli {
    /// 服务端地址
    #[arg(short, long, default_value = "127.0.0.1:4444", global = true)]
    server: String,

    /// 等待服务端消息的超时（秒），0 表示无限等待
    #[arg(long, default_value_t = 120, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 回到初始位置
    Home,

    /// 完整对接流程
    PlugIn {
        #[command(flatten)]
        args: PlugInCommand,
    },

    /// 拔出并回到初始位置
    PlugOut,

    /// 数据采集探测，打印探测后的遥测位姿
    CollectData,

    /// 查询服务端状态快照
    Status,

    /// 发送任意信封
    Send {
        #[command(flatten)]
        args: SendCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dock_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));
    let mut client = DockClient::connect(&cli.server, timeout)
        .with_context(|| format!("Is dock-server running at {}?", cli.server))?;

    match cli.command {
        Commands::Home => {
            client.send(&Envelope::command("move_home", Map::new()))?;
            println!("🏠 已发送回零命令");
            Ok(())
        },

        Commands::PlugIn { args } => args.execute(&mut client),

        Commands::PlugOut => {
            client.send(&Envelope::command("start_unplug", Map::new()))?;
            println!("⏳ 拔出中...");
            await_notice(&mut client, notice::EXTRACTION_COMPLETE)?;
            println!("✅ 拔出完成");
            Ok(())
        },

        Commands::CollectData => {
            client.send(&Envelope::command("collect_data", Map::new()))?;
            println!("📊 探测运动中...");
            let pose = await_pose(&mut client)?;
            println!("{}", pose);
            Ok(())
        },

        Commands::Status => {
            let status = client.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        },

        Commands::Send { args } => args.execute(&mut client),
    }
}
