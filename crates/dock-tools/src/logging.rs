//! # 日志初始化
//!
//! - `RUST_LOG` 优先于配置的级别
//! - 文件输出：非阻塞，每日轮转
//! - 控制台输出（stderr）可选
//!
//! 返回的 [`WorkerGuard`] 必须在进程生命周期内保持存活，
//! drop 时会刷出缓冲的日志。

use crate::config::LoggingConfig;
use std::io;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// 日志初始化错误
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Global subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

/// 安装全局 `tracing` 订阅者
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    std::fs::create_dir_all(&config.dir)?;
    let appender = tracing_appender::rolling::daily(&config.dir, &config.file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
    let console_layer = config
        .console
        .then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        "Logging to {} ({})",
        config.dir.join(&config.file_name).display(),
        config.level
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            dir: dir.path().join("logs"),
            file_name: "test.log".to_string(),
            level: "info".to_string(),
            console: false,
        };

        let guard = init_logging(&config).unwrap();
        tracing::info!("hello from test");
        drop(guard);

        let entries: Vec<_> = std::fs::read_dir(&config.dir).unwrap().collect();
        assert!(!entries.is_empty());

        // 全局订阅者只能安装一次
        assert!(matches!(init_logging(&config), Err(LoggingError::Init(_))));
    }
}
