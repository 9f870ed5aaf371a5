// 上传分片计划
//
// 后端分片规则：
// - 分片固定 4MB，partseq 从 0 开始连续编号
// - 除最后一个分片外必须恰好 4MB（31299/31364 即为违反该规则的错误码）
// - precreate 与 create 都要携带按 partseq 排序的分片摘要清单

use crate::uploader::hash::{digest, Digest};
use std::ops::Range;
use tracing::debug;

/// 上传分片大小：固定 4MB
pub const UPLOAD_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// 单文件大小上限：4GB（普通账户限制，超出的文件在发起任何请求前拒绝）
pub const MAX_UPLOAD_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// 一个待上传分片
#[derive(Debug, Clone)]
pub struct UploadChunk {
    /// 分片序号（0 起始，连续）
    pub index: usize,
    /// 源文件中的字节范围
    pub range: Range<u64>,
    /// 本地计算的分片摘要
    pub digest: Digest,
}

impl UploadChunk {
    /// 分片大小
    pub fn size(&self) -> u64 {
        self.range.end - self.range.start
    }
}

/// 分片计划
///
/// 由源数据一次性派生：范围连续不重叠、覆盖整个文件，
/// 分片数 = ceil(size / 4MB)。同时计算整文件摘要（部分部署用作去重提示）。
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    chunks: Vec<UploadChunk>,
    total_size: u64,
    content_digest: Digest,
}

impl ChunkPlan {
    pub fn new(data: &[u8]) -> Self {
        let total_size = data.len() as u64;
        let content_digest = digest(data);

        let mut chunks = Vec::new();
        let mut offset = 0u64;
        let mut index = 0usize;
        while offset < total_size {
            let end = (offset + UPLOAD_CHUNK_SIZE).min(total_size);
            let chunk_digest = digest(&data[offset as usize..end as usize]);
            chunks.push(UploadChunk {
                index,
                range: offset..end,
                digest: chunk_digest,
            });
            offset = end;
            index += 1;
        }

        debug!(
            "分片计划: 文件大小={} bytes, 分片数={}, 整文件摘要={}",
            total_size,
            chunks.len(),
            content_digest
        );

        Self {
            chunks,
            total_size,
            content_digest,
        }
    }

    pub fn chunks(&self) -> &[UploadChunk] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// 整文件摘要（与分片摘要相互独立）
    pub fn content_digest(&self) -> Digest {
        self.content_digest
    }

    /// 按 partseq 顺序的分片摘要清单（precreate 的 block_list）
    pub fn block_list(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.digest.to_hex()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_exact_multiple() {
        let data = vec![0u8; (8 * MIB) as usize];
        let plan = ChunkPlan::new(&data);
        assert_eq!(plan.chunk_count(), 2);
        assert_eq!(plan.chunks()[0].range, 0..4 * MIB);
        assert_eq!(plan.chunks()[1].range, 4 * MIB..8 * MIB);
        assert_eq!(plan.chunks()[1].size(), UPLOAD_CHUNK_SIZE);
    }

    #[test]
    fn test_trailing_partial_chunk() {
        let data = vec![7u8; (10 * MIB) as usize];
        let plan = ChunkPlan::new(&data);
        assert_eq!(plan.chunk_count(), 3);
        assert_eq!(plan.chunks()[2].range, 8 * MIB..10 * MIB);
        assert_eq!(plan.chunks()[2].size(), 2 * MIB);
    }

    #[test]
    fn test_empty_input() {
        let plan = ChunkPlan::new(&[]);
        assert_eq!(plan.chunk_count(), 0);
        assert!(plan.block_list().is_empty());
        assert_eq!(plan.total_size(), 0);
    }

    #[test]
    fn test_block_list_matches_chunk_digests() {
        let data = vec![42u8; (5 * MIB) as usize];
        let plan = ChunkPlan::new(&data);
        let block_list = plan.block_list();
        assert_eq!(block_list.len(), 2);
        for (chunk, hex) in plan.chunks().iter().zip(&block_list) {
            assert_eq!(&chunk.digest.to_hex(), hex);
        }
        // 首分片摘要 = 前 4MB 单独散列的结果
        assert_eq!(
            block_list[0],
            crate::uploader::hash::digest(&data[..(4 * MIB) as usize]).to_hex()
        );
    }

    proptest! {
        // 分片覆盖性质：数量 = ceil(S/C)，范围连续不重叠、覆盖整个文件
        #[test]
        fn prop_chunk_coverage(size in 0usize..64 * 1024) {
            let data = vec![1u8; size];
            let plan = ChunkPlan::new(&data);
            let expected = (size as u64).div_ceil(UPLOAD_CHUNK_SIZE) as usize;
            prop_assert_eq!(plan.chunk_count(), expected);

            let mut cursor = 0u64;
            for (i, chunk) in plan.chunks().iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert_eq!(chunk.range.start, cursor);
                cursor = chunk.range.end;
            }
            prop_assert_eq!(cursor, size as u64);
        }
    }
}
