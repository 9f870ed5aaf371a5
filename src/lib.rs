// 网盘书库同步核心库

// 凭证管理模块
pub mod auth;

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 网盘API模块
pub mod pan;

// 书库同步模块
pub mod sync;

// 上传引擎模块
pub mod uploader;

// 导出常用类型
pub use auth::{OauthToken, OauthTokenProvider, StaticTokenProvider, TokenProvider};
pub use config::AppConfig;
pub use pan::{NamingPolicy, NetdiskApi, NetdiskClient};
pub use sync::{BlobStore, CatalogUpdate, LibrarySync, MetadataCatalog};
pub use uploader::{
    ChunkPlan, RemotePathMapper, UploadEngine, UploadError, UploadErrorKind, UploadRequest,
    UploadSuccess,
};
