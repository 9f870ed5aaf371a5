// 上传模块

pub mod chunk;
pub mod engine;
pub mod error;
pub mod hash;
pub mod path;

pub use chunk::{ChunkPlan, UploadChunk, MAX_UPLOAD_FILE_SIZE, UPLOAD_CHUNK_SIZE};
pub use engine::{UploadEngine, UploadRequest};
pub use error::{UploadError, UploadErrorKind, UploadSuccess};
pub use hash::{digest, ContentHasher, Digest};
pub use path::RemotePathMapper;
