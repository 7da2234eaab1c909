//! # 配置
//!
//! TOML 配置文件，分为 `[server]`、`[robot]`、`[motion]`、`[logging]` 四段。
//! 所有字段都有默认值，文件只需写出要覆盖的部分。
//!
//! 环境变量 `DOCK__<SECTION>__<KEY>` 覆盖 `<section>.<key>`（可以更深，如
//! `DOCK__MOTION__WIGGLE__DURATION_SECS`）。变量值按 TOML 字面量解析，
//! 解析失败时作为普通字符串。
//!
//! ```toml
//! [server]
//! port = 4444
//!
//! [robot]
//! ip = "192.168.137.100"
//! home_pose = [400, 0, 300, 0, 180, 0]
//! plug_in_method = "force_control"
//! ```

use dock_planner::{DEFAULT_HOME_TOLERANCE, MotionConfig, PlugInMethod, RobotState};
use dock_protocol::Pose;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "DOCK__";

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "dock.toml";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment override {var}: {reason}")]
    Override { var: String, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockConfig {
    pub server: ServerConfig,
    pub robot: RobotConfig,
    pub motion: MotionConfig,
    pub logging: LoggingConfig,
}

/// 网络前端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4444,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 执行器连接与机器人初始状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub ip: String,
    pub port: u16,
    /// 每条原语的空闲超时（秒）
    pub timeout_secs: u64,
    /// 配置的 home 位姿（mm/deg）；首次标定回零后被示教位姿替换
    pub home_pose: Pose,
    pub accurate_detection: bool,
    pub plug_in_method: PlugInMethod,
    pub front_socket_poses: Vec<Pose>,
    pub home_tolerance: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 7005,
            timeout_secs: 60,
            home_pose: Pose::new(400.0, 0.0, 300.0, 0.0, 180.0, 0.0),
            accurate_detection: true,
            plug_in_method: PlugInMethod::Wiggle,
            front_socket_poses: Vec::new(),
            home_tolerance: DEFAULT_HOME_TOLERANCE,
        }
    }
}

impl RobotConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 启动时的机器人状态
    pub fn initial_state(&self) -> RobotState {
        RobotState::new(self.home_pose)
            .with_front_socket_poses(self.front_socket_poses.clone())
            .with_accurate_detection(self.accurate_detection)
            .with_plug_in_method(self.plug_in_method)
    }
}

/// 日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// `EnvFilter` 语法；`RUST_LOG` 优先
    pub level: String,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "dock-server.log".to_string(),
            level: "info".to_string(),
            console: true,
        }
    }
}

impl DockConfig {
    /// 从文件加载，应用进程环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, std::env::vars())
    }

    /// 从文件加载，应用给定的环境变量覆盖
    ///
    /// # Errors
    /// - `ConfigError::Io`: 文件不存在或不可读
    pub fn load_with_env<I, K, V>(path: impl AsRef<Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Self::from_toml_str(&text, vars)
    }

    /// 同 [`Self::load_with_env`]，但文件不存在时使用默认值
    pub fn load_or_default<I, K, V>(path: impl AsRef<Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, vars),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                Self::from_toml_str("", vars)
            },
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// 解析 TOML 文本，应用覆盖并校验
    pub fn from_toml_str<I, K, V>(text: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table: toml::Table = toml::from_str(text)?;
        apply_overrides(&mut table, vars)?;
        let config: DockConfig = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let robot = &self.robot;
        if !robot.home_tolerance.is_finite() || robot.home_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "robot.home_tolerance must be >= 0, got {}",
                robot.home_tolerance
            )));
        }
        if robot.timeout_secs == 0 {
            return Err(ConfigError::Invalid("robot.timeout_secs must be > 0".to_string()));
        }
        if robot.home_pose.is_zero() {
            return Err(ConfigError::Invalid("robot.home_pose must not be all zeros".to_string()));
        }
        if robot.ip.trim().is_empty() {
            return Err(ConfigError::Invalid("robot.ip must not be empty".to_string()));
        }
        self.motion
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn apply_overrides<I, K, V>(table: &mut toml::Table, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (name, raw) in vars {
        let name = name.as_ref();
        let Some(path) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let keys: Vec<String> = path.split("__").map(str::to_ascii_lowercase).collect();
        if keys.len() < 2 || keys.iter().any(String::is_empty) {
            return Err(ConfigError::Override {
                var: name.to_string(),
                reason: "expected DOCK__<SECTION>__<KEY>".to_string(),
            });
        }

        debug!("Config override {} = {}", keys.join("."), raw.as_ref());
        insert_path(table, &keys, parse_literal(raw.as_ref())).map_err(|reason| {
            ConfigError::Override {
                var: name.to_string(),
                reason,
            }
        })?;
    }
    Ok(())
}

fn insert_path(table: &mut toml::Table, keys: &[String], value: toml::Value) -> Result<(), String> {
    let Some((last, parents)) = keys.split_last() else {
        return Err("empty key path".to_string());
    };

    let mut current = table;
    for key in parents {
        if !current.contains_key(key) {
            current.insert(key.clone(), toml::Value::Table(toml::Table::new()));
        }
        current = match current.get_mut(key) {
            Some(toml::Value::Table(inner)) => inner,
            _ => return Err(format!("'{}' is not a section", key)),
        };
    }
    current.insert(last.clone(), value);
    Ok(())
}

/// TOML 字面量，失败时退回字符串
fn parse_literal(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NO_ENV: [(&str, &str); 0] = [];

    #[test]
    fn test_defaults() {
        let config = DockConfig::from_toml_str("", NO_ENV).unwrap();
        assert_eq!(config, DockConfig::default());
        assert_eq!(config.server.bind_addr(), "127.0.0.1:4444");
        assert_eq!(config.robot.addr(), "127.0.0.1:7005");
        assert_eq!(config.robot.timeout(), Duration::from_secs(60));
        assert!(config.logging.console);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 5555

[robot]
ip = "192.168.137.100"
home_pose = [410, 5, 320, 0, 180, 0]
accurate_detection = false
plug_in_method = "force_control"
front_socket_poses = [[600, 50, 250, 0, 90, 0]]

[motion]
camera_offset = [0, 0, 0, 0, 0, 0]

[motion.wiggle]
duration_secs = 6
"#
        )
        .unwrap();

        let config = DockConfig::load_with_env(file.path(), NO_ENV).unwrap();
        assert_eq!(config.server.port, 5555);
        assert_eq!(config.robot.ip, "192.168.137.100");
        assert_eq!(config.robot.plug_in_method, PlugInMethod::ForceControl);
        assert!(config.motion.camera_offset.is_zero());
        assert_eq!(config.motion.wiggle.duration_secs, 6.0);
        assert_eq!(config.motion.retake_offset, MotionConfig::default().retake_offset);

        let state = config.robot.initial_state();
        assert_eq!(state.current_pose, Pose::new(410.0, 5.0, 320.0, 0.0, 180.0, 0.0));
        assert!(!state.accurate_detection);
        assert_eq!(
            state.front_socket_pose(),
            Some(Pose::new(600.0, 50.0, 250.0, 0.0, 90.0, 0.0))
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("DOCK__ROBOT__IP", "10.0.0.9"),
            ("DOCK__ROBOT__PORT", "7010"),
            ("DOCK__ROBOT__FRONT_SOCKET_POSES", "[[1, 2, 3, 4, 5, 6]]"),
            ("DOCK__MOTION__WIGGLE__DURATION_SECS", "4"),
            ("DOCK__LOGGING__LEVEL", "dock_planner=debug"),
            ("PATH", "/usr/bin"),
        ];
        let config = DockConfig::from_toml_str("[robot]\nip = \"1.2.3.4\"\n", vars).unwrap();
        assert_eq!(config.robot.ip, "10.0.0.9");
        assert_eq!(config.robot.port, 7010);
        assert_eq!(config.robot.front_socket_poses.len(), 1);
        assert_eq!(config.motion.wiggle.duration_secs, 4.0);
        assert_eq!(config.logging.level, "dock_planner=debug");
    }

    #[test]
    fn test_bad_override_name() {
        let err = DockConfig::from_toml_str("", [("DOCK__ROBOT", "x")]).unwrap_err();
        assert!(matches!(err, ConfigError::Override { .. }));

        let err = DockConfig::from_toml_str("[robot]\nip = \"a\"\n", [("DOCK__ROBOT__IP__X", "1")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Override { .. }));
    }

    #[test]
    fn test_validation() {
        let err = DockConfig::from_toml_str("[robot]\nhome_tolerance = -0.1\n", NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DockConfig::from_toml_str("[robot]\ntimeout_secs = 0\n", NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DockConfig::from_toml_str("[robot]\nhome_pose = [0, 0, 0, 0, 0, 0]\n", NO_ENV)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DockConfig::from_toml_str(
            "[motion.docking_speed]\nvelocity = 0\nacceleration = 100\n",
            NO_ENV,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = DockConfig::load_with_env(&path, NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let config = DockConfig::load_or_default(&path, [("DOCK__SERVER__PORT", "4545")]).unwrap();
        assert_eq!(config.server.port, 4545);
    }

    #[test]
    fn test_parse_error() {
        let err = DockConfig::from_toml_str("[robot\nip = 1", NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = DockConfig::from_toml_str("[robot]\nport = \"seven\"\n", NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
