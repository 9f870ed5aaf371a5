// 网盘API数据类型
//
// 字段同时兼容 errno/errmsg（xpan 接口）与 error_code/error_msg（PCS 接口）
// 两套命名，解析时通过 alias 归一到 errno/errmsg。

use serde::{Deserialize, Serialize};

/// 文件命名策略（rtype）
///
/// 服务端在目标路径已存在同名文件时的冲突处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingPolicy {
    /// 0 = 不重命名，冲突时报错
    NoRename,
    /// 1 = 冲突时重命名（默认，避免覆盖）
    Rename,
    /// 2 = 冲突且内容不同时才重命名
    RenameIfConflict,
    /// 3 = 冲突时覆盖
    Overwrite,
}

impl NamingPolicy {
    /// 线上协议的 rtype 值
    pub fn as_rtype(&self) -> &'static str {
        match self {
            NamingPolicy::NoRename => "0",
            NamingPolicy::Rename => "1",
            NamingPolicy::RenameIfConflict => "2",
            NamingPolicy::Overwrite => "3",
        }
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        NamingPolicy::Rename
    }
}

/// 创建目录响应
#[derive(Debug, Default, Deserialize)]
pub struct MkdirResponse {
    /// 错误码（0 表示成功）
    #[serde(default, alias = "error_code")]
    pub errno: i64,

    /// 错误信息
    #[serde(default, alias = "error_msg")]
    pub errmsg: String,

    /// 服务端实际创建的路径
    #[serde(default)]
    pub path: String,
}

/// 预创建（negotiate）响应
#[derive(Debug, Default, Deserialize)]
pub struct PrecreateResponse {
    /// 错误码（0 表示成功）
    #[serde(default, alias = "error_code")]
    pub errno: i64,

    /// 错误信息
    #[serde(default, alias = "error_msg")]
    pub errmsg: String,

    /// 上传会话 ID（后续分片上传与 create 必需；缺失即失败）
    #[serde(default)]
    pub uploadid: String,

    /// 策略提示（1=普通上传，2=文件已存在；仅供参考，可能缺失）
    #[serde(default)]
    pub return_type: Option<i64>,

    /// 需要上传的分片序号列表（可能为空）
    #[serde(default)]
    pub block_list: Vec<i64>,

    /// 服务端回显的路径
    #[serde(default)]
    pub path: String,
}

/// 上传端点信息
#[derive(Debug, Clone, Deserialize)]
pub struct UploadServerInfo {
    /// 端点地址（如 `https://c.pcs.example.com`）
    #[serde(default)]
    pub server: String,
}

/// 上传端点发现（locateupload）响应
#[derive(Debug, Default, Deserialize)]
pub struct LocateUploadResponse {
    /// 错误码（0 表示成功）
    #[serde(default, alias = "error_code")]
    pub errno: i64,

    /// 错误信息
    #[serde(default, alias = "error_msg")]
    pub errmsg: String,

    /// 主端点列表（优先使用）
    #[serde(default)]
    pub servers: Vec<UploadServerInfo>,

    /// 备用端点列表
    #[serde(default)]
    pub bak_servers: Vec<UploadServerInfo>,

    /// 端点列表有效期（秒）
    #[serde(default)]
    pub expire: i64,
}

impl LocateUploadResponse {
    /// 第一个加密传输（https）端点，主列表优先于备用列表
    pub fn first_secure_server(&self) -> Option<String> {
        self.servers
            .iter()
            .chain(self.bak_servers.iter())
            .find(|info| info.server.starts_with("https://"))
            .map(|info| info.server.trim_end_matches('/').to_string())
    }
}

/// 分片上传（superfile2）响应
#[derive(Debug, Default, Deserialize)]
pub struct PartUploadResponse {
    /// 错误码（0 表示成功）
    #[serde(default, alias = "error_code")]
    pub errno: i64,

    /// 错误信息
    #[serde(default, alias = "error_msg")]
    pub errmsg: String,

    /// 服务端确认的分片摘要（尽力提供，可能为空）
    #[serde(default)]
    pub md5: String,

    /// 请求 ID
    #[serde(default)]
    pub request_id: u64,
}

/// 创建文件（finalize）响应
#[derive(Debug, Default, Deserialize)]
pub struct CreateFileResponse {
    /// 错误码（0 表示成功）
    #[serde(default, alias = "error_code")]
    pub errno: i64,

    /// 错误信息
    #[serde(default, alias = "error_msg")]
    pub errmsg: String,

    /// 文件服务器 ID
    #[serde(default, rename = "fs_id")]
    pub fs_id: u64,

    /// 最终落盘路径（命名策略生效后可能与请求路径不同）
    #[serde(default)]
    pub path: String,

    /// 文件大小
    #[serde(default)]
    pub size: u64,

    /// 文件摘要
    #[serde(default)]
    pub md5: String,

    /// 是否目录
    #[serde(default)]
    pub isdir: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_policy_rtype() {
        assert_eq!(NamingPolicy::NoRename.as_rtype(), "0");
        assert_eq!(NamingPolicy::Rename.as_rtype(), "1");
        assert_eq!(NamingPolicy::RenameIfConflict.as_rtype(), "2");
        assert_eq!(NamingPolicy::Overwrite.as_rtype(), "3");
    }

    #[test]
    fn test_precreate_missing_return_type() {
        // return_type 可能整体缺失，解析后必须是 None 而不是报错
        let resp: PrecreateResponse =
            serde_json::from_str(r#"{"errno":0,"uploadid":"N1-abc"}"#).unwrap();
        assert_eq!(resp.return_type, None);
        assert_eq!(resp.uploadid, "N1-abc");
    }

    #[test]
    fn test_errno_alias() {
        // PCS 接口用 error_code/error_msg 命名
        let resp: PartUploadResponse =
            serde_json::from_str(r#"{"error_code":31363,"error_msg":"part missing"}"#).unwrap();
        assert_eq!(resp.errno, 31363);
        assert_eq!(resp.errmsg, "part missing");
    }

    #[test]
    fn test_first_secure_server() {
        let resp: LocateUploadResponse = serde_json::from_str(
            r#"{
                "error_code": 0,
                "servers": [
                    {"server": "http://plain.pcs.example.com"},
                    {"server": "https://c3.pcs.example.com/"}
                ],
                "bak_servers": [{"server": "https://bak.pcs.example.com"}]
            }"#,
        )
        .unwrap();
        assert_eq!(
            resp.first_secure_server(),
            Some("https://c3.pcs.example.com".to_string())
        );

        let none: LocateUploadResponse =
            serde_json::from_str(r#"{"error_code":0,"servers":[{"server":"http://x"}]}"#).unwrap();
        assert_eq!(none.first_secure_server(), None);
    }
}
