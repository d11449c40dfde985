//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（novelist.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["novelist", "novelist.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `NOVELIST_`，层级分隔符 `__`）
/// 2. 配置文件（novelist.toml 或 novelist.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `NOVELIST_API__BASE_URL=https://writer.example.com/api`
/// - `NOVELIST_POLLING__INTERVAL_MS=1000`
/// - `NOVELIST_POLLING__MODE=stream`
/// - `NOVELIST_STORAGE__STATE_DIR=/var/lib/novelist`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = builder
        .set_default("api.base_url", "http://localhost:8000/api")?
        .set_default("api.timeout_secs", 60)?
        .set_default("api.connect_timeout_secs", 10)?
        .set_default("polling.interval_ms", 2000)?
        .set_default("polling.mode", "poll")?
        .set_default("storage.state_dir", "data/client")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: NOVELIST_API__BASE_URL=http://backend:8000/api
    builder = builder.add_source(
        Environment::with_prefix("NOVELIST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "API base URL cannot be empty".to_string(),
        ));
    }

    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "API base URL must be http(s): {}",
            config.api.base_url
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "API timeout cannot be 0".to_string(),
        ));
    }

    if config.polling.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Polling interval cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Client Configuration ===");
    tracing::info!("API Base URL: {}", config.api.base_url);
    tracing::info!("API Timeout: {}s", config.api.timeout_secs);
    tracing::info!("Watch Mode: {:?}", config.polling.mode);
    tracing::info!("Poll Interval: {}ms", config.polling.interval_ms);
    tracing::info!("State Directory: {:?}", config.storage.state_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("============================");
}
