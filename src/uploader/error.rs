// 上传错误分类
//
// 策略：每个组件返回带类型的结果，编排器只决定继续（良性）或终止（致命），
// 不吞错误；未识别的后端错误码一律按致命处理（fail-closed），
// 并保留原始错误码便于诊断。

use std::fmt;

/// 上传失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// 文件/目录名非法或无权访问（errno -7）
    InvalidNameOrAccess,
    /// 云端容量已满（errno -10）
    QuotaExceeded,
    /// 目标已存在（errno -8，finalize 阶段；mkdir 阶段该码是良性的）
    AlreadyExists,
    /// 未开通上传权限（errno 31024）
    MissingUploadPermission,
    /// 首分片小于 4MB（errno 31299）
    FirstChunkTooSmall,
    /// 分片超出大小限制（errno 31364）
    ChunkTooLarge,
    /// 分片缺失（errno 31363）
    ChunksMissing,
    /// 分片清单与服务端实收不一致（errno 10 / 31190）
    SizeOrManifestMismatch,
    /// uploadid 等会话参数异常（errno 31355）
    InvalidSessionParameter,
    /// 文件总大小超限（errno 31365）
    TotalSizeExceeded,
    /// 本地校验：超出单文件大小上限，未发起任何网络请求
    FileTooLarge,
    /// precreate 响应缺少 uploadid
    SessionMissing,
    /// 访问凭证获取或刷新失败
    Auth,
    /// 未识别的后端错误码（按致命处理）
    Vendor,
    /// 传输层失败（连接、读取、响应不可解析）
    Transport,
    /// 单步超时
    Timeout,
    /// 调用方取消
    Cancelled,
}

/// 上传失败
///
/// 终态值之一（另一个是 [`UploadSuccess`]），始终携带失败分类，
/// 以及可用时的原始后端错误码。
#[derive(Debug, Clone)]
pub struct UploadError {
    pub kind: UploadErrorKind,
    /// 原始后端错误码（仅后端分类的失败携带）
    pub vendor_code: Option<i64>,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            vendor_code: None,
            message: message.into(),
        }
    }

    pub fn vendor(kind: UploadErrorKind, errno: i64, message: impl Into<String>) -> Self {
        Self {
            kind,
            vendor_code: Some(errno),
            message: message.into(),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_code {
            Some(code) => write!(f, "{:?} (errno={}): {}", self.kind, code, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for UploadError {}

/// 上传成功
#[derive(Debug, Clone)]
pub struct UploadSuccess {
    /// 服务端最终落盘的远端路径
    pub remote_path: String,
    /// 文件服务器 ID
    pub fs_id: u64,
}

/// 分片上传阶段的错误码映射
pub fn part_error_kind(errno: i64) -> UploadErrorKind {
    match errno {
        31024 => UploadErrorKind::MissingUploadPermission,
        31299 => UploadErrorKind::FirstChunkTooSmall,
        31364 => UploadErrorKind::ChunkTooLarge,
        31363 => UploadErrorKind::ChunksMissing,
        _ => UploadErrorKind::Vendor,
    }
}

/// finalize（create）阶段的错误码映射
pub fn finalize_error_kind(errno: i64) -> UploadErrorKind {
    match errno {
        -7 => UploadErrorKind::InvalidNameOrAccess,
        -8 => UploadErrorKind::AlreadyExists,
        -10 => UploadErrorKind::QuotaExceeded,
        10 | 31190 => UploadErrorKind::SizeOrManifestMismatch,
        31355 => UploadErrorKind::InvalidSessionParameter,
        31365 => UploadErrorKind::TotalSizeExceeded,
        _ => UploadErrorKind::Vendor,
    }
}

/// 分片上传阶段的提示信息
pub fn part_error_message(errno: i64) -> &'static str {
    match errno {
        31024 => "没有申请上传权限，请在开放平台申请开通",
        31299 => "第一个分片的大小小于 4MB",
        31364 => "分片超出大小限制，应以 4MB 为上限",
        31363 => "分片缺失，请检查分片是否全部上传、size 是否正确",
        _ => "分片上传失败",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_error_mapping() {
        assert_eq!(
            part_error_kind(31024),
            UploadErrorKind::MissingUploadPermission
        );
        assert_eq!(part_error_kind(31299), UploadErrorKind::FirstChunkTooSmall);
        assert_eq!(part_error_kind(31364), UploadErrorKind::ChunkTooLarge);
        assert_eq!(part_error_kind(31363), UploadErrorKind::ChunksMissing);
        // 未识别错误码 fail-closed
        assert_eq!(part_error_kind(99999), UploadErrorKind::Vendor);
    }

    #[test]
    fn test_finalize_error_mapping() {
        assert_eq!(
            finalize_error_kind(10),
            UploadErrorKind::SizeOrManifestMismatch
        );
        assert_eq!(
            finalize_error_kind(31190),
            UploadErrorKind::SizeOrManifestMismatch
        );
        assert_eq!(
            finalize_error_kind(31355),
            UploadErrorKind::InvalidSessionParameter
        );
        assert_eq!(finalize_error_kind(31365), UploadErrorKind::TotalSizeExceeded);
        assert_eq!(finalize_error_kind(-7), UploadErrorKind::InvalidNameOrAccess);
        assert_eq!(finalize_error_kind(-10), UploadErrorKind::QuotaExceeded);
        assert_eq!(finalize_error_kind(12345), UploadErrorKind::Vendor);
    }

    #[test]
    fn test_display_keeps_vendor_code() {
        let err = UploadError::vendor(UploadErrorKind::QuotaExceeded, -10, "云端容量已满");
        let rendered = err.to_string();
        assert!(rendered.contains("errno=-10"));
        assert!(rendered.contains("QuotaExceeded"));
    }
}
