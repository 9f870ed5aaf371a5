// 上传引擎
//
// 三段式上传编排：negotiate（precreate 注册分片清单）→ 顺序上传分片
// （superfile2）→ finalize（create 按序提交确认摘要）。
//
// 关键规则：
// - 超出单文件大小上限的请求在发起任何网络调用前就拒绝
// - 分片严格按 partseq 顺序逐个上传，前一片失败立即终止
// - finalize 的 block_list 使用服务端确认摘要（缺失时退回本地摘要），
//   顺序必须与分片序号一致，否则后端以清单不符拒绝
// - 上传端点发现失败不终止上传，退回默认域名

use crate::config::AppConfig;
use crate::pan::{ApiError, NamingPolicy, NetdiskApi, PrecreateResponse};
use crate::uploader::chunk::ChunkPlan;
use crate::uploader::error::{
    finalize_error_kind, part_error_kind, part_error_message, UploadError, UploadErrorKind,
    UploadSuccess,
};
use crate::uploader::path::RemotePathMapper;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 一次上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// 源数据（完整驻留内存）
    pub data: Vec<u8>,
    /// 目标文件名
    pub file_name: String,
    /// 目标目录（用户侧路径，自动映射到应用命名空间下）
    pub target_dir: String,
    /// 命名冲突策略
    pub policy: NamingPolicy,
}

/// 协商成功后的上传会话
#[derive(Debug, Clone)]
struct UploadSession {
    upload_id: String,
    remote_path: String,
}

/// 上传引擎
///
/// 对 API 的依赖通过 trait 注入，无全局状态；同一个引擎可被多次调用。
pub struct UploadEngine<A: NetdiskApi> {
    api: A,
    mapper: RemotePathMapper,
    default_upload_domain: String,
    max_file_size: u64,
    step_timeout: Duration,
    cancel: CancellationToken,
}

impl<A: NetdiskApi> UploadEngine<A> {
    pub fn new(api: A, config: &AppConfig) -> Self {
        Self {
            api,
            mapper: RemotePathMapper::new(&config.api.app_name),
            default_upload_domain: config
                .api
                .default_upload_domain
                .trim_end_matches('/')
                .to_string(),
            max_file_size: config.upload.max_file_size,
            step_timeout: Duration::from_secs(config.upload.step_timeout_secs),
            cancel: CancellationToken::new(),
        }
    }

    /// 绑定取消令牌：每个网络步骤之间检查一次
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 路径映射器（供调用方预览最终远端路径）
    pub fn mapper(&self) -> &RemotePathMapper {
        &self.mapper
    }

    // =====================================================
    // 主流程
    // =====================================================

    /// 执行一次完整上传
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadSuccess, UploadError> {
        self.ensure_not_cancelled()?;

        // 本地校验：大小超限直接拒绝，不发任何请求
        let total_size = request.data.len() as u64;
        if total_size > self.max_file_size {
            return Err(UploadError::new(
                UploadErrorKind::FileTooLarge,
                format!(
                    "文件大小 {} 超出上限 {}",
                    total_size, self.max_file_size
                ),
            ));
        }

        let remote_dir = self.mapper.normalize(&request.target_dir);
        let remote_path = self
            .mapper
            .normalize(&format!("{}/{}", request.target_dir, request.file_name));

        info!(
            "开始上传: remote_path={}, size={}, rtype={}",
            remote_path,
            total_size,
            request.policy.as_rtype()
        );

        let plan = ChunkPlan::new(&request.data);

        self.ensure_directory(&remote_dir).await?;

        self.ensure_not_cancelled()?;
        let session = self
            .negotiate(&remote_path, total_size, request.policy, &plan)
            .await?;

        self.ensure_not_cancelled()?;
        let upload_domain = self.resolve_upload_domain(&session).await;

        let confirmed = self
            .upload_parts(&session, &upload_domain, &request.data, &plan)
            .await?;

        self.ensure_not_cancelled()?;
        self.finalize(&session, total_size, request.policy, confirmed)
            .await
    }

    // =====================================================
    // 各阶段
    // =====================================================

    /// 确保目标目录存在（幂等：已存在视为成功）
    async fn ensure_directory(&self, remote_dir: &str) -> Result<(), UploadError> {
        // 应用根目录由服务端保证存在，无需创建
        if remote_dir == self.mapper.root() {
            return Ok(());
        }

        self.ensure_not_cancelled()?;
        let response = self.step(self.api.mkdir(remote_dir), "创建目录").await?;

        match response.errno {
            0 => {
                debug!("目录已创建: {}", remote_dir);
                Ok(())
            }
            // 目录已存在，属于正常情况
            -8 | 113 => {
                debug!("目录已存在: {} (errno={})", remote_dir, response.errno);
                Ok(())
            }
            -7 => Err(UploadError::vendor(
                UploadErrorKind::InvalidNameOrAccess,
                -7,
                format!("目录名非法或无权访问: {}", remote_dir),
            )),
            -10 => Err(UploadError::vendor(
                UploadErrorKind::QuotaExceeded,
                -10,
                "云端容量已满",
            )),
            errno => Err(UploadError::vendor(
                UploadErrorKind::Vendor,
                errno,
                format!("创建目录失败: {}", response.errmsg),
            )),
        }
    }

    /// 协商上传会话（precreate）
    async fn negotiate(
        &self,
        remote_path: &str,
        total_size: u64,
        policy: NamingPolicy,
        plan: &ChunkPlan,
    ) -> Result<UploadSession, UploadError> {
        let block_list = plan.block_list();
        let response: PrecreateResponse = self
            .step(
                self.api
                    .precreate(remote_path, total_size, false, policy, &block_list),
                "预创建",
            )
            .await?;

        match response.errno {
            0 => {}
            -7 => {
                return Err(UploadError::vendor(
                    UploadErrorKind::InvalidNameOrAccess,
                    -7,
                    format!("文件名非法或无权访问: {}", remote_path),
                ))
            }
            -10 => {
                return Err(UploadError::vendor(
                    UploadErrorKind::QuotaExceeded,
                    -10,
                    "云端容量已满",
                ))
            }
            // 其余错误码仅记录：uploadid 在场与否才是权威信号
            errno => warn!(
                "预创建返回非零错误码: errno={}, errmsg={}，继续检查会话",
                errno, response.errmsg
            ),
        }

        if response.uploadid.is_empty() {
            return Err(UploadError::new(
                UploadErrorKind::SessionMissing,
                "预创建响应缺少 uploadid",
            ));
        }

        // return_type 仅供参考：2 表示同内容文件已存在，流程照常走完
        debug!(
            "预创建成功: uploadid={}, return_type={:?}",
            response.uploadid, response.return_type
        );

        Ok(UploadSession {
            upload_id: response.uploadid,
            remote_path: remote_path.to_string(),
        })
    }

    /// 发现上传端点；任何失败都退回默认域名，不终止上传
    async fn resolve_upload_domain(&self, session: &UploadSession) -> String {
        let result = self
            .step(
                self.api
                    .locate_upload(&session.remote_path, &session.upload_id),
                "获取上传端点",
            )
            .await;

        match result {
            Ok(response) if response.errno == 0 => match response.first_secure_server() {
                Some(server) => {
                    info!("使用上传端点: {}", server);
                    server
                }
                None => {
                    warn!("端点列表没有可用的加密端点，退回默认域名");
                    self.default_upload_domain.clone()
                }
            },
            Ok(response) => {
                warn!(
                    "获取上传端点失败: errno={}, errmsg={}，退回默认域名",
                    response.errno, response.errmsg
                );
                self.default_upload_domain.clone()
            }
            Err(e) => {
                warn!("获取上传端点失败: {}，退回默认域名", e);
                self.default_upload_domain.clone()
            }
        }
    }

    /// 顺序上传所有分片，返回按 partseq 排序的确认摘要清单
    async fn upload_parts(
        &self,
        session: &UploadSession,
        upload_domain: &str,
        data: &[u8],
        plan: &ChunkPlan,
    ) -> Result<Vec<String>, UploadError> {
        let mut confirmed = Vec::with_capacity(plan.chunk_count());

        for chunk in plan.chunks() {
            self.ensure_not_cancelled()?;

            let slice = data[chunk.range.start as usize..chunk.range.end as usize].to_vec();
            let response = self
                .step(
                    self.api.upload_part(
                        upload_domain,
                        &session.remote_path,
                        &session.upload_id,
                        chunk.index,
                        slice,
                    ),
                    "上传分片",
                )
                .await?;

            if response.errno != 0 {
                error!(
                    "上传分片失败: part={}, errno={}, errmsg={}",
                    chunk.index, response.errno, response.errmsg
                );
                return Err(UploadError::vendor(
                    part_error_kind(response.errno),
                    response.errno,
                    part_error_message(response.errno),
                ));
            }

            // 确认摘要以服务端回传为准，缺失时退回本地计算值
            let digest = if response.md5.is_empty() {
                chunk.digest.to_hex()
            } else {
                response.md5
            };
            debug!(
                "分片上传成功: part={}/{}, md5={}",
                chunk.index + 1,
                plan.chunk_count(),
                digest
            );
            confirmed.push(digest);
        }

        Ok(confirmed)
    }

    /// 提交会话（create），确认摘要按分片序号排序
    async fn finalize(
        &self,
        session: &UploadSession,
        total_size: u64,
        policy: NamingPolicy,
        confirmed: Vec<String>,
    ) -> Result<UploadSuccess, UploadError> {
        let response = self
            .step(
                self.api.create_file(
                    &session.remote_path,
                    total_size,
                    false,
                    policy,
                    &confirmed,
                    &session.upload_id,
                ),
                "创建文件",
            )
            .await?;

        if response.errno != 0 {
            error!(
                "创建文件失败: errno={}, errmsg={}",
                response.errno, response.errmsg
            );
            return Err(UploadError::vendor(
                finalize_error_kind(response.errno),
                response.errno,
                format!("创建文件失败: {}", response.errmsg),
            ));
        }

        // 命名策略生效后服务端路径可能与请求不同，以响应为准
        let final_path = if response.path.is_empty() {
            session.remote_path.clone()
        } else {
            response.path
        };
        info!(
            "上传完成: path={}, fs_id={}, size={}",
            final_path, response.fs_id, response.size
        );

        Ok(UploadSuccess {
            remote_path: final_path,
            fs_id: response.fs_id,
        })
    }

    // =====================================================
    // 辅助
    // =====================================================

    fn ensure_not_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::new(
                UploadErrorKind::Cancelled,
                "上传已被调用方取消",
            ))
        } else {
            Ok(())
        }
    }

    /// 单步执行：统一套用超时，并把传输层错误折算成上传错误
    async fn step<T, F>(&self, fut: F, what: &str) -> Result<T, UploadError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(ApiError::Auth(msg))) => Err(UploadError::new(
                UploadErrorKind::Auth,
                format!("{}: {}", what, msg),
            )),
            Ok(Err(e)) => Err(UploadError::new(
                UploadErrorKind::Transport,
                format!("{}: {}", what, e),
            )),
            Err(_) => Err(UploadError::new(
                UploadErrorKind::Timeout,
                format!("{}超时 ({}秒)", what, self.step_timeout.as_secs()),
            )),
        }
    }
}
