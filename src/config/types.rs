//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 后端 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 任务观察配置
    #[serde(default)]
    pub polling: PollingConfig,

    /// 本地存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 后端 API 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端基础 URL（包含 `/api` 前缀）
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 普通请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// 建立连接的超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// 长任务的观察方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// 定时轮询 `GET /tasks/{id}`
    #[default]
    Poll,
    /// 订阅 `GET /tasks/{id}/events` SSE 推送
    Stream,
}

/// 任务观察配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// 观察方式
    #[serde(default)]
    pub mode: WatchMode,
}

fn default_interval_ms() -> u64 {
    2000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            mode: WatchMode::Poll,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// 本地存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 本地状态目录（凭据、缓存用户、偏好）
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("data/client")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl StorageConfig {
    /// sled 数据库路径
    pub fn sled_path(&self) -> PathBuf {
        self.state_dir.join("state.sled")
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
