//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（echo.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, StreamProtocol};

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
const CONFIG_FILE_NAMES: &[&str] = &["echo", "echo.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "ECHO";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `ECHO_`，层级分隔符 `__`）
/// 2. 配置文件（echo.toml 或 echo.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `ECHO_STREAM__URL=ws://gen-server:8000/ws/generate`
/// - `ECHO_STREAM__FPS=24`
/// - `ECHO_PLAYBACK__GATE=warmup`
/// - `ECHO_OUTPUT__FRAMES_DIR=/tmp/frames`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("stream.url", "ws://localhost:8000/ws/generate")?
        .set_default("stream.protocol", "unified")?
        .set_default("stream.fps", 16)?
        .set_default("stream.num_scenes", 5)?
        .set_default("stream.legacy.video_url", "ws://localhost:8000/ws/video")?
        .set_default("stream.legacy.audio_url", "ws://localhost:8000/ws/audio")?
        .set_default("stream.legacy.blocks_per_chunk", 3)?
        .set_default("playback.gate", "scene_complete")?
        .set_default("playback.warmup_ms", 3000)?
        .set_default("audio.backend", "log")?
        .set_default("audio.sample_rate", 48000)?
        .set_default("audio.channels", 2)?
        .set_default("output.save_every_frame", 1)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
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
    if config.stream.fps == 0 {
        return Err(ConfigError::ValidationError(
            "Stream fps must be greater than 0".to_string(),
        ));
    }

    if config.stream.num_scenes == 0 {
        return Err(ConfigError::ValidationError(
            "Number of scenes must be greater than 0".to_string(),
        ));
    }

    match config.stream.protocol {
        StreamProtocol::Unified => {
            if config.stream.url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Stream URL cannot be empty".to_string(),
                ));
            }
        }
        StreamProtocol::Legacy => {
            let legacy = &config.stream.legacy;
            if legacy.video_url.is_empty() || legacy.audio_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Legacy video and audio URLs cannot be empty".to_string(),
                ));
            }
            if legacy.blocks_per_chunk == 0 {
                return Err(ConfigError::ValidationError(
                    "blocks_per_chunk must be greater than 0".to_string(),
                ));
            }
        }
    }

    if config.audio.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "Audio sample rate must be greater than 0".to_string(),
        ));
    }

    if config.audio.channels == 0 {
        return Err(ConfigError::ValidationError(
            "Audio channels must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Echo Player Configuration ===");
    tracing::info!("Protocol: {}", config.stream.protocol);
    match config.stream.protocol {
        StreamProtocol::Unified => tracing::info!("Stream URL: {}", config.stream.url),
        StreamProtocol::Legacy => {
            tracing::info!("Video URL: {}", config.stream.legacy.video_url);
            tracing::info!("Audio URL: {}", config.stream.legacy.audio_url);
            tracing::info!(
                "Switch Frames: {:?}",
                config.stream.legacy.switch_frame_indices
            );
        }
    }
    tracing::info!("FPS: {}", config.stream.fps);
    tracing::info!("Scenes: {}", config.stream.num_scenes);
    tracing::info!("Gate: {}", config.playback.gate);
    tracing::info!("Warmup: {}ms", config.playback.warmup_ms);
    tracing::info!(
        "Audio Output: {} ({} Hz, {} ch)",
        config.audio.backend,
        config.audio.sample_rate,
        config.audio.channels
    );
    match &config.output.frames_dir {
        Some(dir) => tracing::info!("Frames Directory: {:?}", dir),
        None => tracing::info!("Frames Directory: (log only)"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
