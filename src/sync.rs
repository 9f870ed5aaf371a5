// 书库同步
//
// 把本地书库里的一本书推到网盘：从内容仓取出字节，清洗文件名，
// 交给上传引擎，成功后把远端路径写回元数据目录。

use crate::pan::{NamingPolicy, NetdiskApi};
use crate::uploader::{UploadEngine, UploadRequest, UploadSuccess};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// 远端存储类型标识（写入元数据目录）
pub const STORAGE_KIND_NETDISK: &str = "baidupan";

/// 文件名长度上限（字符数）
const MAX_FILE_NAME_LEN: usize = 200;

/// 书籍内容仓
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 按键取内容；不存在返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入内容（已存在则覆盖）
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
}

/// 书库元数据目录
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    async fn apply(&self, book_id: &str, update: CatalogUpdate) -> Result<()>;
}

/// 上传成功后写回目录的字段
#[derive(Debug, Clone)]
pub struct CatalogUpdate {
    /// 存储类型（固定 [`STORAGE_KIND_NETDISK`]）
    pub storage_kind: String,
    /// 远端路径（命名策略生效后的最终路径）
    pub remote_path: String,
}

/// 书籍内容在内容仓中的键
pub fn blob_key(book_id: &str) -> String {
    format!("ebook_content_{}", book_id)
}

/// 清洗文件名：去掉保留字符，空白折叠为下划线，限制长度
pub fn clean_file_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\') {
            continue;
        }
        if c.is_whitespace() {
            if !in_whitespace && !cleaned.is_empty() {
                cleaned.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        cleaned.push(c);
    }
    while cleaned.ends_with('_') {
        cleaned.pop();
    }
    cleaned.chars().take(MAX_FILE_NAME_LEN).collect()
}

/// 书库同步器
pub struct LibrarySync<A: NetdiskApi> {
    engine: UploadEngine<A>,
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<dyn MetadataCatalog>,
    /// 远端目标目录（应用命名空间下）
    target_dir: String,
}

impl<A: NetdiskApi> LibrarySync<A> {
    pub fn new(
        engine: UploadEngine<A>,
        blobs: Arc<dyn BlobStore>,
        catalog: Arc<dyn MetadataCatalog>,
        target_dir: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            blobs,
            catalog,
            target_dir: target_dir.into(),
        }
    }

    /// 上传一本书并回写目录
    ///
    /// # 参数
    /// * `book_id` - 书籍 ID（决定内容仓键）
    /// * `display_name` - 展示名（清洗后作为远端文件名，含扩展名）
    pub async fn upload_book(&self, book_id: &str, display_name: &str) -> Result<UploadSuccess> {
        let key = blob_key(book_id);
        let data = self
            .blobs
            .get(&key)
            .await?
            .with_context(|| format!("内容仓中找不到书籍内容: {}", key))?;

        let file_name = clean_file_name(display_name);
        if file_name.is_empty() {
            anyhow::bail!("清洗后的文件名为空: {:?}", display_name);
        }

        info!(
            "同步书籍: id={}, file_name={}, size={}",
            book_id,
            file_name,
            data.len()
        );

        let success = self
            .engine
            .upload(UploadRequest {
                data,
                file_name,
                target_dir: self.target_dir.clone(),
                policy: NamingPolicy::Rename,
            })
            .await?;

        self.catalog
            .apply(
                book_id,
                CatalogUpdate {
                    storage_kind: STORAGE_KIND_NETDISK.to_string(),
                    remote_path: success.remote_path.clone(),
                },
            )
            .await
            .context("回写元数据目录失败")?;

        Ok(success)
    }
}
