//! 试卷同步流程 - 流程层
//!
//! 核心职责：把"一个试卷目录"同步成数据库中的一条 Exam 和若干 ExamQuestion。
//!
//! 流程顺序：
//! 1. 扫描汇总目录中的题目文件，没有则跳过（不写库）
//! 2. 开启事务，按目录名查找试卷：不存在则创建，存在则刷新题目数和更新时间
//! 3. 逐题插入，已存在的 `(exam_id, question_no)` 保持不变
//! 4. 提交；任何一步失败则整体回滚

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::{AppResult, StoreError};
use crate::infrastructure::store::{ExamStore, StoreTransaction};
use crate::models::exam::{now_iso8601, NewExam, SkipReason};
use crate::services::directory_scanner::{DirectoryScanner, ExamDir, QuestionFile};
use crate::services::name_resolver;

/// 单个目录的同步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Skipped(SkipReason),
}

/// 单个目录的同步报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub exam_dir_name: String,
    pub outcome: ReconcileOutcome,
    /// 跳过时为 `None`；预览模式下新建的试卷也为 `None`
    pub exam_id: Option<i64>,
    /// 合法题目文件数
    pub question_count: usize,
    /// 本次新写入（预览模式下为将要写入）的题目行数
    pub new_question_rows: usize,
    /// 是否为预览（未写库）
    pub dry_run: bool,
}

impl ReconcileReport {
    pub fn skipped(
        dir: &ExamDir,
        reason: SkipReason,
        question_count: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            exam_dir_name: dir.name.clone(),
            outcome: ReconcileOutcome::Skipped(reason),
            exam_id: None,
            question_count,
            new_question_rows: 0,
            dry_run,
        }
    }
}

/// 同步引擎
///
/// - 只依赖 `ExamStore` 抽象，不关心方言
/// - 一个目录一个事务
/// - 不持有任何可变状态，可对同一目录重复执行
pub struct ReconciliationEngine<'a, S: ExamStore> {
    store: &'a S,
    scanner: &'a DirectoryScanner,
}

impl<'a, S: ExamStore> ReconciliationEngine<'a, S> {
    pub fn new(store: &'a S, scanner: &'a DirectoryScanner) -> Self {
        Self { store, scanner }
    }

    /// 同步一个试卷目录
    ///
    /// 返回错误时该目录的事务已回滚，调用方可继续处理下一个目录。
    pub async fn reconcile(&self, dir: &ExamDir) -> AppResult<ReconcileReport> {
        let files = self.scanner.question_files(&dir.path)?;
        if files.is_empty() {
            info!("[试卷 {}] 跳过: 无题目", dir.name);
            return Ok(ReconcileReport::skipped(dir, SkipReason::NoQuestions, 0, false));
        }

        let mut tx = self.store.begin().await?;
        let applied = apply(&mut tx, dir, &files, &now_iso8601()).await;

        let result: AppResult<ReconcileReport> = match applied {
            Ok(report) => tx.commit().await.map(|_| report).map_err(Into::into),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("[试卷 {}] 回滚失败: {}", dir.name, rollback_err);
                }
                Err(e)
            }
        };

        match result {
            Ok(report) => {
                log_report(&report);
                Ok(report)
            }
            Err(e) if e.is_unique_violation() => {
                info!("[试卷 {}] 已被其他写入方同步，跳过: {}", dir.name, e);
                Ok(ReconcileReport::skipped(
                    dir,
                    SkipReason::AlreadyReconciled,
                    files.len(),
                    false,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// 预览同步结果，只读
    pub async fn preview(&self, dir: &ExamDir) -> AppResult<ReconcileReport> {
        let files = self.scanner.question_files(&dir.path)?;
        if files.is_empty() {
            return Ok(ReconcileReport::skipped(dir, SkipReason::NoQuestions, 0, true));
        }

        let report = match self.store.fetch_exam(&dir.name).await? {
            None => ReconcileReport {
                exam_dir_name: dir.name.clone(),
                outcome: ReconcileOutcome::Created,
                exam_id: None,
                question_count: files.len(),
                new_question_rows: files.len(),
                dry_run: true,
            },
            Some(exam) => {
                let existing: HashSet<i64> = self
                    .store
                    .list_questions(exam.id)
                    .await?
                    .into_iter()
                    .map(|q| q.question_no)
                    .collect();
                let new_rows = files
                    .iter()
                    .filter(|f| !existing.contains(&f.question_no))
                    .count();

                ReconcileReport {
                    exam_dir_name: dir.name.clone(),
                    outcome: ReconcileOutcome::Updated,
                    exam_id: Some(exam.id),
                    question_count: files.len(),
                    new_question_rows: new_rows,
                    dry_run: true,
                }
            }
        };

        log_report(&report);
        Ok(report)
    }
}

/// 在事务内写入一个目录
async fn apply<T: StoreTransaction>(
    tx: &mut T,
    dir: &ExamDir,
    files: &[QuestionFile],
    now: &str,
) -> AppResult<ReconcileReport> {
    let question_count = files.len() as i64;

    let (exam_id, outcome) = match tx.find_exam_by_dir(&dir.name).await? {
        Some(exam_id) => {
            tx.touch_exam(exam_id, question_count, now).await?;
            (exam_id, ReconcileOutcome::Updated)
        }
        None => {
            let display_name = name_resolver::resolve(&dir.name);
            let new_exam = NewExam {
                exam_dir_name: &dir.name,
                display_name: &display_name,
                question_count,
                now,
            };
            match tx.insert_exam(&new_exam).await? {
                Some(exam_id) => (exam_id, ReconcileOutcome::Created),
                // 查找与插入之间被其他写入方创建，按已存在处理
                None => {
                    let exam_id = tx
                        .find_exam_by_dir(&dir.name)
                        .await?
                        .ok_or_else(|| {
                            StoreError::query("insert_exam", sqlx::Error::RowNotFound)
                        })?;
                    tx.touch_exam(exam_id, question_count, now).await?;
                    (exam_id, ReconcileOutcome::Updated)
                }
            }
        }
    };

    let mut new_rows = 0;
    for file in files {
        if tx
            .insert_question(exam_id, file.question_no, &file.filename, now)
            .await?
        {
            new_rows += 1;
        } else {
            debug!("[试卷 {}] 题目 {} 已存在", dir.name, file.question_no);
        }
    }

    Ok(ReconcileReport {
        exam_dir_name: dir.name.clone(),
        outcome,
        exam_id: Some(exam_id),
        question_count: files.len(),
        new_question_rows: new_rows,
        dry_run: false,
    })
}

fn log_report(report: &ReconcileReport) {
    let prefix = if report.dry_run { "[DRY RUN] " } else { "" };
    match report.outcome {
        ReconcileOutcome::Created => info!(
            "[试卷 {}] {}✅ 创建 ({} 题, 新增 {} 条题目记录)",
            report.exam_dir_name, prefix, report.question_count, report.new_question_rows
        ),
        ReconcileOutcome::Updated => info!(
            "[试卷 {}] {}✓ 已存在, 更新题目数为 {} (新增 {} 条题目记录)",
            report.exam_dir_name, prefix, report.question_count, report.new_question_rows
        ),
        ReconcileOutcome::Skipped(reason) => {
            info!("[试卷 {}] {}跳过: {}", report.exam_dir_name, prefix, reason)
        }
    }
}
