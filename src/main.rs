// 命令行入口：把本地文件上传到网盘的应用目录

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use netdisk_sync::pan::NamingPolicy;
use netdisk_sync::uploader::{UploadEngine, UploadRequest};
use netdisk_sync::{
    AppConfig, NetdiskClient, OauthTokenProvider, StaticTokenProvider, TokenProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "netdisk-sync", version, about = "上传文件到网盘应用目录")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 要上传的本地文件
    file: PathBuf,

    /// 远端目标目录（应用命名空间下）
    #[arg(short = 'd', long, default_value = "")]
    remote_dir: String,

    /// 命名冲突策略
    #[arg(long, value_enum, default_value = "rename")]
    ondup: Ondup,

    /// 直接指定 access_token（跳过 OAuth 刷新流程）
    #[arg(long)]
    access_token: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ondup {
    /// 冲突时报错
    Fail,
    /// 冲突时重命名
    Rename,
    /// 冲突且内容不同时才重命名
    Newcopy,
    /// 冲突时覆盖
    Overwrite,
}

impl From<Ondup> for NamingPolicy {
    fn from(value: Ondup) -> Self {
        match value {
            Ondup::Fail => NamingPolicy::NoRename,
            Ondup::Rename => NamingPolicy::Rename,
            Ondup::Newcopy => NamingPolicy::RenameIfConflict,
            Ondup::Overwrite => NamingPolicy::Overwrite,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config).await;
    let _log_guard = netdisk_sync::logging::init_logging(&config.log);

    let token: Arc<dyn TokenProvider> = match cli.access_token {
        Some(token) => Arc::new(StaticTokenProvider::new(token)),
        None => Arc::new(
            OauthTokenProvider::load(&config.api.oauth_base, config.oauth.clone())
                .await
                .context("加载 OAuth 令牌失败，可用 --access-token 跳过")?,
        ),
    };

    let client = NetdiskClient::new(&config.api, token)?;

    // Ctrl-C 触发取消，引擎在下一个步骤边界停下
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，正在取消上传");
                cancel.cancel();
            }
        });
    }

    let engine = UploadEngine::new(client, &config).with_cancellation(cancel);

    let file_name = cli
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .context("无法从路径取得文件名")?
        .to_string();
    let data = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("读取文件失败: {:?}", cli.file))?;

    info!("本地文件: {:?}, 大小: {} bytes", cli.file, data.len());

    let success = engine
        .upload(UploadRequest {
            data,
            file_name,
            target_dir: cli.remote_dir,
            policy: cli.ondup.into(),
        })
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("上传完成: {} (fs_id={})", success.remote_path, success.fs_id);
    Ok(())
}
