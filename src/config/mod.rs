// 配置管理模块
//
// 全部配置显式传递：引擎和客户端只持有自己关心的片段，
// 没有进程级可变全局状态。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API 配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// OAuth 配置
    #[serde(default)]
    pub oauth: OauthConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// xpan 接口基址
    #[serde(default = "default_xpan_base")]
    pub xpan_base: String,
    /// OAuth 接口基址
    #[serde(default = "default_oauth_base")]
    pub oauth_base: String,
    /// 默认上传域名（locateupload 失败时也用它兜底）
    #[serde(default = "default_upload_domain")]
    pub default_upload_domain: String,
    /// 应用名（远端根目录为 /apps/<应用名>）
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// 请求 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_xpan_base() -> String {
    "https://pan.baidu.com".to_string()
}

fn default_oauth_base() -> String {
    "https://openapi.baidu.com/oauth/2.0".to_string()
}

fn default_upload_domain() -> String {
    "https://d.pcs.baidu.com".to_string()
}

fn default_app_name() -> String {
    "Neat Reader".to_string()
}

fn default_user_agent() -> String {
    "netdisk-sync/0.3".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            xpan_base: default_xpan_base(),
            oauth_base: default_oauth_base(),
            default_upload_domain: default_upload_domain(),
            app_name: default_app_name(),
            user_agent: default_user_agent(),
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 单文件大小上限（字节，默认 4GB，普通账户限制）
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// 单步网络操作超时（秒）
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_max_file_size() -> u64 {
    crate::uploader::chunk::MAX_UPLOAD_FILE_SIZE
}

fn default_step_timeout_secs() -> u64 {
    60
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

/// OAuth 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OauthConfig {
    /// 应用的 API Key
    #[serde(default)]
    pub client_id: String,
    /// 应用的 Secret Key
    #[serde(default)]
    pub client_secret: String,
    /// 令牌文件路径
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("读取配置文件失败: {}", path))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path))?;

        Ok(config)
    }

    /// 加载配置，失败时退回默认值
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.upload.max_file_size, 4 * 1024 * 1024 * 1024);
        assert_eq!(config.upload.step_timeout_secs, 60);
        assert_eq!(config.api.default_upload_domain, "https://d.pcs.baidu.com");
        assert!(config.log.enabled);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [upload]
            step_timeout_secs = 10

            [oauth]
            client_id = "ak"
            client_secret = "sk"
            "#,
        )
        .unwrap();
        assert_eq!(config.upload.step_timeout_secs, 10);
        assert_eq!(config.upload.max_file_size, 4 * 1024 * 1024 * 1024);
        assert_eq!(config.oauth.client_id, "ak");
        assert_eq!(config.api.app_name, "Neat Reader");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [api]
            app_name = "Demo App"

            [log]
            enabled = false
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.api.app_name, "Demo App");
        assert!(!config.log.enabled);
        // 未出现的段落落到默认值
        assert_eq!(config.upload.step_timeout_secs, 60);
    }

    #[tokio::test]
    async fn test_load_missing_file_falls_back() {
        let config = AppConfig::load_or_default("/nonexistent/config.toml").await;
        assert_eq!(config.api.xpan_base, "https://pan.baidu.com");
    }
}
