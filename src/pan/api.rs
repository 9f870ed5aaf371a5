// 网盘API接口抽象
//
// 上传引擎只依赖这个 trait；真实实现是 reqwest 客户端（经由请求转发层
// 访问后端），测试里用记录调用的替身实现。

use crate::pan::types::{
    CreateFileResponse, LocateUploadResponse, MkdirResponse, NamingPolicy, PartUploadResponse,
    PrecreateResponse,
};
use async_trait::async_trait;
use thiserror::Error;

/// 传输层/凭证层错误
///
/// 后端业务错误码不在这里表达：响应只要能解析就原样返回，
/// 由上传引擎按阶段解释 errno。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 访问凭证获取或刷新失败（硬性终止）
    #[error("获取访问凭证失败: {0}")]
    Auth(String),

    /// 请求发送或响应读取失败
    #[error("请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    /// 响应不是预期的 JSON 结构
    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 网盘上传相关的后端调用面
#[async_trait]
pub trait NetdiskApi: Send + Sync {
    /// 创建目录（create, isdir=1）
    async fn mkdir(&self, path: &str) -> Result<MkdirResponse, ApiError>;

    /// 预创建（precreate）：注册大小、命名策略与完整分片摘要清单
    async fn precreate(
        &self,
        path: &str,
        size: u64,
        is_dir: bool,
        policy: NamingPolicy,
        block_list: &[String],
    ) -> Result<PrecreateResponse, ApiError>;

    /// 发现可用上传端点（locateupload）
    async fn locate_upload(
        &self,
        path: &str,
        upload_id: &str,
    ) -> Result<LocateUploadResponse, ApiError>;

    /// 上传一个分片（superfile2, type=tmpfile）
    async fn upload_part(
        &self,
        upload_domain: &str,
        path: &str,
        upload_id: &str,
        part_seq: usize,
        data: Vec<u8>,
    ) -> Result<PartUploadResponse, ApiError>;

    /// 创建文件（create, isdir=0）：提交会话与按序分片摘要清单
    async fn create_file(
        &self,
        path: &str,
        size: u64,
        is_dir: bool,
        policy: NamingPolicy,
        block_list: &[String],
        upload_id: &str,
    ) -> Result<CreateFileResponse, ApiError>;
}
