// 网盘API模块

pub mod api;
pub mod client;
pub mod types;

pub use api::{ApiError, NetdiskApi};
pub use client::NetdiskClient;
pub use types::{
    CreateFileResponse, LocateUploadResponse, MkdirResponse, NamingPolicy, PartUploadResponse,
    PrecreateResponse, UploadServerInfo,
};
