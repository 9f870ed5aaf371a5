// 网盘客户端实现
//
// 只负责发请求和解析响应：业务错误码（errno）原样带回，
// 由上传引擎按阶段决定良性/致命。

use crate::auth::TokenProvider;
use crate::config::ApiConfig;
use crate::pan::api::{ApiError, NetdiskApi};
use crate::pan::types::{
    CreateFileResponse, LocateUploadResponse, MkdirResponse, NamingPolicy, PartUploadResponse,
    PrecreateResponse,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// 网盘客户端
#[derive(Clone)]
pub struct NetdiskClient {
    /// HTTP客户端
    http: Client,
    /// 访问凭证提供者
    token: Arc<dyn TokenProvider>,
    /// xpan 接口基址（如 `https://pan.baidu.com`）
    xpan_base: String,
    /// 默认上传域名（locateupload 挂在这里）
    default_upload_domain: String,
}

impl NetdiskClient {
    /// 创建新的网盘客户端
    ///
    /// # 参数
    /// * `config` - API 基址与 User-Agent 配置
    /// * `token` - 访问凭证提供者（过期自动刷新）
    pub fn new(config: &ApiConfig, token: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            http,
            token,
            xpan_base: config.xpan_base.trim_end_matches('/').to_string(),
            default_upload_domain: config
                .default_upload_domain
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// 取当前有效的 access_token
    async fn access_token(&self) -> Result<String, ApiError> {
        self.token
            .access_token()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))
    }

    /// xpan file 接口地址
    fn xpan_file_url(&self, method: &str, access_token: &str) -> String {
        format!(
            "{}/rest/2.0/xpan/file?method={}&access_token={}",
            self.xpan_base, method, access_token
        )
    }
}

#[async_trait]
impl NetdiskApi for NetdiskClient {
    async fn mkdir(&self, path: &str) -> Result<MkdirResponse, ApiError> {
        info!("创建目录: path={}", path);

        let access_token = self.access_token().await?;
        let url = self.xpan_file_url("create", &access_token);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("path", path),
                ("isdir", "1"),
                // 目录不重命名：已存在由调用方按良性处理
                ("rtype", "0"),
            ])
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("创建目录响应: status={}, body={}", status, response_text);

        Ok(serde_json::from_str(&response_text)?)
    }

    async fn precreate(
        &self,
        path: &str,
        size: u64,
        is_dir: bool,
        policy: NamingPolicy,
        block_list: &[String],
    ) -> Result<PrecreateResponse, ApiError> {
        info!(
            "预创建文件: path={}, size={}, 分片数={}",
            path,
            size,
            block_list.len()
        );

        let access_token = self.access_token().await?;
        let url = self.xpan_file_url("precreate", &access_token);
        let block_list_json = serde_json::to_string(block_list)?;

        let response = self
            .http
            .post(&url)
            .form(&[
                ("path", path),
                ("size", &size.to_string()),
                ("isdir", if is_dir { "1" } else { "0" }),
                ("autoinit", "1"),
                ("rtype", policy.as_rtype()),
                ("block_list", &block_list_json),
            ])
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("预创建响应: status={}, body={}", status, response_text);

        Ok(serde_json::from_str(&response_text)?)
    }

    async fn locate_upload(
        &self,
        path: &str,
        upload_id: &str,
    ) -> Result<LocateUploadResponse, ApiError> {
        info!("获取上传端点: path={}", path);

        let access_token = self.access_token().await?;
        let url = format!(
            "{}/rest/2.0/pcs/file?\
             method=locateupload&\
             appid=250528&\
             upload_version=2.0&\
             access_token={}&\
             path={}&\
             uploadid={}",
            self.default_upload_domain,
            access_token,
            urlencoding::encode(path),
            urlencoding::encode(upload_id)
        );

        let response = self.http.get(&url).send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("locateupload 响应: status={}, body={}", status, response_text);

        Ok(serde_json::from_str(&response_text)?)
    }

    async fn upload_part(
        &self,
        upload_domain: &str,
        path: &str,
        upload_id: &str,
        part_seq: usize,
        data: Vec<u8>,
    ) -> Result<PartUploadResponse, ApiError> {
        info!(
            "上传分片: path={}, uploadid={}..., part={}, size={}, server={}",
            path,
            &upload_id[..8.min(upload_id.len())],
            part_seq,
            data.len(),
            upload_domain
        );

        let access_token = self.access_token().await?;
        let url = format!(
            "{}/rest/2.0/pcs/superfile2?\
             method=upload&\
             access_token={}&\
             type=tmpfile&\
             path={}&\
             uploadid={}&\
             partseq={}",
            upload_domain.trim_end_matches('/'),
            access_token,
            urlencoding::encode(path),
            urlencoding::encode(upload_id),
            part_seq
        );

        let part = multipart::Part::bytes(data)
            .file_name("file")
            .mime_str("application/octet-stream")
            .map_err(ApiError::Transport)?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!(
            "上传分片响应: part={}, status={}, body={}",
            part_seq, status, response_text
        );

        Ok(serde_json::from_str(&response_text)?)
    }

    async fn create_file(
        &self,
        path: &str,
        size: u64,
        is_dir: bool,
        policy: NamingPolicy,
        block_list: &[String],
        upload_id: &str,
    ) -> Result<CreateFileResponse, ApiError> {
        info!("创建文件: path={}, size={}", path, size);

        let access_token = self.access_token().await?;
        let url = self.xpan_file_url("create", &access_token);
        let block_list_json = serde_json::to_string(block_list)?;

        let response = self
            .http
            .post(&url)
            .form(&[
                ("path", path),
                ("size", &size.to_string()),
                ("isdir", if is_dir { "1" } else { "0" }),
                ("rtype", policy.as_rtype()),
                ("uploadid", upload_id),
                ("block_list", &block_list_json),
            ])
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        info!("创建文件响应: status={}, body={}", status, response_text);

        Ok(serde_json::from_str(&response_text)?)
    }
}
