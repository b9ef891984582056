use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exam_sync::utils::logging;
use exam_sync::{open_backend, App, Backend, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::warn;

/// 试卷产物同步与完整性检查
#[derive(Debug, Parser)]
#[command(name = "exam-sync", version, about)]
struct Cli {
    /// 试卷产物根目录（覆盖配置）
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// 数据库 URL（覆盖配置）
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// 显示详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 把试卷目录同步到数据库
    Sync {
        /// 只同步这一个目录（路径或根目录下的目录名）
        target: Option<PathBuf>,

        /// 只预览，不写库
        #[arg(long)]
        dry_run: bool,
    },
    /// 检查试卷提取完整性
    Verify {
        /// 试卷目录；省略时读取指针文件
        #[arg(conflicts_with = "all")]
        target: Option<PathBuf>,

        /// 检查根目录下全部试卷
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// 返回本次运行是否完全成功
async fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load().context("加载配置失败")?;
    if let Some(root) = cli.root {
        config.artifacts_root = root;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config.verbose_logging |= cli.verbose;

    logging::init(config.verbose_logging);

    let app = App::new(config);
    let cancel = app.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️ 收到 Ctrl-C，当前目录处理完成后停止");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    match cli.command {
        Command::Sync { target, dry_run } => {
            let mode = if dry_run { "同步预览" } else { "同步" };
            logging::log_startup(mode, app.config());

            let backend = open_backend(&app.config().database_url)
                .await
                .context("打开数据库失败")?;
            let summary = match &backend {
                Backend::Sqlite(store) => app.run_sync(store, target.as_deref(), dry_run).await,
                Backend::Postgres(store) => app.run_sync(store, target.as_deref(), dry_run).await,
            }
            .context("同步失败")?;

            Ok(summary.success())
        }
        Command::Verify { target, all } => {
            logging::log_startup("完整性检查", app.config());

            let summary = app
                .run_verify(target.as_deref(), all)
                .context("完整性检查失败")?;

            Ok(summary.passed())
        }
    }
}
