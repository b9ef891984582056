//! 批量试卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量同步与批量检查的调度。
//!
//! ## 核心功能
//!
//! 1. **目标解析**：显式目录、指针文件或根目录下全部试卷
//! 2. **批量同步**：逐个目录调用 `ReconciliationEngine`，单个目录失败不影响其余目录
//! 3. **批量检查**：逐个试卷调用 `exam_processor::verify_exam`
//! 4. **中断处理**：每个目录开始前检查中断标记，进行中的目录事务总会完整结束
//! 5. **全局统计**：汇总新建、更新、跳过、失败数
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个目录的细节
//! - **严格串行**：一次只处理一个目录
//! - **向下委托**：同步委托 workflow，检查委托 exam_processor

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ExamStore;
use crate::models::loaders::read_pointer;
use crate::orchestrator::exam_processor;
use crate::services::{Candidate, DirectoryScanner, ExamDir, IntegrityClassifier, VerifySummary};
use crate::utils::logging;
use crate::workflow::{ReconcileOutcome, ReconcileReport, ReconciliationEngine};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 同步统计
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 是否因中断提前结束
    pub interrupted: bool,
    pub dry_run: bool,
    /// 成功处理（含跳过）的目录报告，按处理顺序
    pub reports: Vec<ReconcileReport>,
    /// 失败目录：(目录名, 错误信息)
    pub failures: Vec<(String, String)>,
}

impl SyncSummary {
    fn record(&mut self, report: ReconcileReport) {
        match report.outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Skipped(_) => self.skipped += 1,
        }
        self.reports.push(report);
    }

    fn record_failure(&mut self, dir: &ExamDir, err: &AppError) {
        self.failed += 1;
        self.failures.push((dir.name.clone(), err.to_string()));
    }

    /// 无失败且未被中断
    pub fn success(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    scanner: DirectoryScanner,
    classifier: IntegrityClassifier,
    cancel: Arc<AtomicBool>,
}

impl App {
    /// 按配置创建应用
    pub fn new(config: Config) -> Self {
        let scanner = DirectoryScanner::new(config.aggregate_dir.clone());
        let classifier = IntegrityClassifier::new(config.anomaly_ratio);
        Self {
            config,
            scanner,
            classifier,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 中断标记，置为 `true` 后不再开始新的目录
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// 同步试卷目录到数据库
    ///
    /// # 参数
    /// - `store`: 已建表的存储
    /// - `target`: 指定单个目录；`None` 时同步根目录下全部目录
    /// - `dry_run`: 只预览，不写库
    ///
    /// # 返回
    /// 根目录或指定目录不存在时返回错误；单个目录的失败计入统计
    pub async fn run_sync<S: ExamStore>(
        &self,
        store: &S,
        target: Option<&Path>,
        dry_run: bool,
    ) -> AppResult<SyncSummary> {
        let candidates: Vec<Candidate> = match target {
            Some(target) => {
                let path = self.resolve_target(target)?;
                vec![self.scanner.inspect(&path)]
            }
            None => self.scanner.candidates(&self.config.artifacts_root)?.collect(),
        };

        let eligible = candidates
            .iter()
            .filter(|c| matches!(c, Candidate::Eligible(_)))
            .count();
        logging::log_candidates_found(eligible, candidates.len());

        let engine = ReconciliationEngine::new(store, &self.scanner);
        let mut summary = SyncSummary {
            dry_run,
            ..Default::default()
        };

        for (idx, candidate) in candidates.iter().enumerate() {
            if self.cancelled() {
                warn!(
                    "⚠️ 收到中断信号，停止处理 (剩余 {} 个目录)",
                    candidates.len() - idx
                );
                summary.interrupted = true;
                break;
            }

            match candidate {
                Candidate::Ineligible { dir, reason } => {
                    info!("[试卷 {}] 跳过: {}", dir.name, reason);
                    summary.record(ReconcileReport::skipped(dir, *reason, 0, dry_run));
                }
                Candidate::Eligible(dir) => {
                    let result = if dry_run {
                        engine.preview(dir).await
                    } else {
                        engine.reconcile(dir).await
                    };
                    match result {
                        Ok(report) => summary.record(report),
                        Err(e) => {
                            error!("[试卷 {}] ❌ 同步失败: {}", dir.name, e);
                            summary.record_failure(dir, &e);
                        }
                    }
                }
            }
        }

        if !dry_run {
            match store.list_exams().await {
                Ok(exams) => debug!("数据库中共有 {} 份试卷", exams.len()),
                Err(e) => warn!("读取试卷列表失败: {}", e),
            }
        }

        logging::print_sync_stats(&summary);
        Ok(summary)
    }

    /// 检查试卷完整性
    ///
    /// # 参数
    /// - `target`: 指定试卷目录；`None` 时读取指针文件
    /// - `all`: 检查根目录下全部试卷，忽略 `target`
    ///
    /// # 返回
    /// 目标目录或指针文件不存在时返回错误
    pub fn run_verify(&self, target: Option<&Path>, all: bool) -> AppResult<VerifySummary> {
        let dirs: Vec<ExamDir> = if all {
            self.scanner
                .candidates(&self.config.artifacts_root)?
                .map(|c| c.dir().clone())
                .collect()
        } else {
            let path = match target {
                Some(target) => self.resolve_target(target)?,
                None => self.resolve_pointer()?,
            };
            vec![ExamDir::from_path(&path)]
        };

        let mut summary = VerifySummary::default();
        for dir in &dirs {
            if self.cancelled() {
                warn!("⚠️ 收到中断信号，停止检查");
                summary.errors.push("检查被中断".to_string());
                break;
            }

            match exam_processor::verify_exam(&self.scanner, &self.classifier, dir) {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!("[试卷 {}] ❌ 检查失败: {}", dir.name, e);
                    summary.errors.push(format!("{}: {}", dir.name, e));
                }
            }
        }

        logging::print_verify_stats(&summary);
        Ok(summary)
    }

    /// 显式目录：先按原样查找，再按根目录下的目录名查找
    fn resolve_target(&self, target: &Path) -> AppResult<PathBuf> {
        if target.is_dir() {
            return Ok(target.to_path_buf());
        }
        let under_root = self.config.artifacts_root.join(target);
        if under_root.is_dir() {
            return Ok(under_root);
        }
        Err(AppError::directory_not_found(target))
    }

    /// 指针文件中记录的最近处理试卷
    fn resolve_pointer(&self) -> AppResult<PathBuf> {
        let pointer = self.config.pointer_path();
        let name = read_pointer(&pointer)?;
        info!("📌 最近处理的试卷: {}", name);

        let path = self.config.artifacts_root.join(&name);
        if !path.is_dir() {
            return Err(AppError::directory_not_found(path));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn app_for(root: &Path) -> App {
        App::new(Config {
            artifacts_root: root.to_path_buf(),
            ..Config::default()
        })
    }

    #[test]
    fn test_resolve_target_by_name_under_root() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("examA")).unwrap();
        let app = app_for(root.path());

        let path = app.resolve_target(Path::new("examA")).unwrap();
        assert_eq!(path, root.path().join("examA"));
        assert!(app.resolve_target(Path::new("missing")).is_err());
    }

    #[test]
    fn test_resolve_pointer() {
        let root = TempDir::new().unwrap();
        let app = app_for(root.path());
        assert!(app.resolve_pointer().is_err());

        fs::create_dir_all(root.path().join("examA")).unwrap();
        fs::write(root.path().join(".last_processed"), "examA\n").unwrap();
        assert_eq!(app.resolve_pointer().unwrap(), root.path().join("examA"));

        fs::write(root.path().join(".last_processed"), "gone").unwrap();
        assert!(app.resolve_pointer().is_err());
    }

    #[test]
    fn test_summary_success() {
        let mut summary = SyncSummary::default();
        assert!(summary.success());
        summary.interrupted = true;
        assert!(!summary.success());
    }
}
