//! # Dock Tools
//!
//! 应用层共享工具：
//!
//! - `config`: TOML 配置文件 + `DOCK__SECTION__KEY` 环境变量覆盖
//! - `logging`: `tracing` 订阅者初始化（文件每日轮转 + 可选控制台）

pub mod config;
pub mod logging;

pub use config::{ConfigError, DockConfig, LoggingConfig, RobotConfig, ServerConfig};
pub use logging::{LoggingError, init_logging};
