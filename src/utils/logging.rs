/// 日志工具模块
///
/// 提供日志初始化和输出格式化的辅助函数
use crate::config::Config;
use crate::orchestrator::SyncSummary;
use crate::services::VerifySummary;
use crate::workflow::ReconcileOutcome;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，详细模式下为 `debug`。
/// 重复调用时静默忽略（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `mode`: 运行模式描述
/// - `config`: 当前配置
pub fn log_startup(mode: &str, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!("📁 试卷根目录: {}", config.artifacts_root.display());
    info!("{}", "=".repeat(60));
}

/// 记录候选目录扫描结果
///
/// # 参数
/// - `eligible`: 可同步目录数
/// - `total`: 候选目录总数
pub fn log_candidates_found(eligible: usize, total: usize) {
    info!("✓ 找到 {} 个试卷目录，其中 {} 个可同步", total, eligible);
}

/// 输出同步统计
pub fn print_sync_stats(summary: &SyncSummary) {
    let title = if summary.dry_run {
        "📊 同步预览统计 [DRY RUN]"
    } else {
        "📊 同步完成统计"
    };

    info!("\n{}", "=".repeat(60));
    info!("{}", title);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 新建: {}", summary.created);
    info!("🔄 更新: {}", summary.updated);
    info!("⏭️ 跳过: {}", summary.skipped);
    info!("❌ 失败: {}", summary.failed);
    if summary.interrupted {
        warn!("⚠️ 已中断，剩余目录未处理");
    }

    for report in &summary.reports {
        if let ReconcileOutcome::Skipped(reason) = report.outcome {
            info!("  - {}: {}", report.exam_dir_name, reason);
        }
    }
    for (name, message) in &summary.failures {
        error!("  - {}: {}", name, message);
    }
    info!("{}", "=".repeat(60));
}

/// 输出完整性检查统计
pub fn print_verify_stats(summary: &VerifySummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 完整性检查统计");
    info!("{}", "=".repeat(60));
    let checked = summary.reports.len() + summary.errors.len();
    info!("📄 检查试卷: {}", checked);
    info!("❌ 未通过: {}", summary.failed_exams());

    for report in summary.reports.iter().filter(|r| !r.passed()) {
        warn!(
            "  - {}: {} 个问题",
            report.exam_dir_name,
            report.issues.len()
        );
    }
    for message in &summary.errors {
        error!("  - {}", message);
    }

    if summary.passed() {
        info!("✓ 完整性验证通过");
    } else {
        warn!("⚠ 完整性验证未通过");
    }
    info!("{}", "=".repeat(60));
}
