// 凭证管理
//
// 上传引擎在每次网络操作前通过 TokenProvider 拿到有效的 access_token；
// 令牌过期时先走 refresh_token 刷新，刷新失败视为硬性错误终止整个上传。

use crate::config::OauthConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 刷新提前量：过期前 60 秒就视为失效，避免请求在途时过期
const EXPIRY_MARGIN_MS: i64 = 60 * 1000;

/// 访问凭证提供者
///
/// 并发安全：多个上传会话共享同一个实例。
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// 返回当前有效的 access_token，必要时先刷新
    async fn access_token(&self) -> Result<String>;
}

/// 固定令牌（测试与短期脚本用）
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// OAuth 令牌（磁盘持久化格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// 过期时刻（Unix 毫秒）
    pub expires_at_ms: i64,
}

impl OauthToken {
    /// 是否仍然有效（带提前量）
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && self.expires_at_ms - EXPIRY_MARGIN_MS > now_ms
    }
}

/// OAuth 令牌接口响应
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    /// 有效期（秒）
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// 基于 refresh_token 自动续期的凭证提供者
///
/// 刷新成功后把新令牌写回磁盘，进程重启后无需重新授权。
pub struct OauthTokenProvider {
    http: reqwest::Client,
    oauth_base: String,
    config: OauthConfig,
    token_path: PathBuf,
    token: Mutex<OauthToken>,
}

impl OauthTokenProvider {
    /// 从令牌文件加载
    pub async fn load(oauth_base: &str, config: OauthConfig) -> Result<Self> {
        let token_path = config.token_path.clone();
        let raw = tokio::fs::read_to_string(&token_path)
            .await
            .with_context(|| format!("读取令牌文件失败: {:?}", token_path))?;
        let token: OauthToken =
            serde_json::from_str(&raw).with_context(|| format!("解析令牌文件失败: {:?}", token_path))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("创建 OAuth HTTP 客户端失败")?;

        Ok(Self {
            http,
            oauth_base: oauth_base.trim_end_matches('/').to_string(),
            config,
            token_path,
            token: Mutex::new(token),
        })
    }

    /// 用 refresh_token 换取新令牌
    async fn refresh(&self, refresh_token: &str) -> Result<OauthToken> {
        info!("access_token 已失效，开始刷新");

        let url = format!("{}/token", self.oauth_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .send()
            .await
            .context("刷新令牌请求失败")?;

        let status = response.status();
        let body = response.text().await.context("读取刷新令牌响应失败")?;
        if !status.is_success() {
            anyhow::bail!("刷新令牌失败: status={}, body={}", status, body);
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).context("解析刷新令牌响应失败")?;
        if !parsed.error.is_empty() || parsed.error_code != 0 {
            anyhow::bail!(
                "刷新令牌被拒绝: error={} {}, error_code={} {}",
                parsed.error,
                parsed.error_description,
                parsed.error_code,
                parsed.error_msg
            );
        }
        if parsed.access_token.is_empty() {
            anyhow::bail!("刷新令牌响应缺少 access_token");
        }

        let token = OauthToken {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at_ms: Utc::now().timestamp_millis() + parsed.expires_in * 1000,
        };
        info!("刷新令牌成功, 有效期 {} 秒", parsed.expires_in);
        Ok(token)
    }

    /// 持久化令牌；写盘失败不影响本次上传，只记录告警
    async fn persist(&self, token: &OauthToken) {
        match serde_json::to_string_pretty(token) {
            Ok(raw) => {
                if let Err(e) = tokio::fs::write(&self.token_path, raw).await {
                    warn!("令牌写盘失败: {:?}: {}", self.token_path, e);
                }
            }
            Err(e) => warn!("令牌序列化失败: {}", e),
        }
    }
}

#[async_trait]
impl TokenProvider for OauthTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        let now_ms = Utc::now().timestamp_millis();
        if token.is_valid_at(now_ms) {
            return Ok(token.access_token.clone());
        }

        if token.refresh_token.is_empty() {
            anyhow::bail!("没有可用的 refresh_token，无法刷新访问凭证");
        }

        let refreshed = self.refresh(&token.refresh_token).await?;
        *token = refreshed.clone();
        drop(token);

        self.persist(&refreshed).await;
        Ok(refreshed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validity_margin() {
        let token = OauthToken {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at_ms: 1_000_000,
        };
        // 距过期超过 60 秒 → 有效
        assert!(token.is_valid_at(1_000_000 - 61_000));
        // 距过期不足 60 秒 → 视为失效
        assert!(!token.is_valid_at(1_000_000 - 59_000));
        assert!(!token.is_valid_at(1_000_001));
    }

    #[test]
    fn test_empty_token_invalid() {
        let token = OauthToken {
            access_token: String::new(),
            refresh_token: "rt".to_string(),
            expires_at_ms: i64::MAX,
        };
        assert!(!token.is_valid_at(0));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new("fixed-token");
        assert_eq!(provider.access_token().await.unwrap(), "fixed-token");
    }
}
