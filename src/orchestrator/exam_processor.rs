//! 单份试卷完整性检查 - 编排层
//!
//! 遍历一份试卷的所有页面，逐页分类并汇总成报告。只读，不碰数据库。

use crate::error::AppResult;
use crate::services::{DirectoryScanner, ExamDir, ExamReport, IntegrityClassifier};
use tracing::{debug, info};

/// 检查单份试卷
///
/// # 参数
/// - `scanner`: 目录扫描器
/// - `classifier`: 完整性分类器
/// - `dir`: 试卷目录
///
/// # 返回
/// 返回该试卷的报告；目录无法读取时返回错误
pub fn verify_exam(
    scanner: &DirectoryScanner,
    classifier: &IntegrityClassifier,
    dir: &ExamDir,
) -> AppResult<ExamReport> {
    info!("[试卷 {}] 🔍 开始完整性检查", dir.name);

    let pages = scanner.pages(&dir.path)?;
    let mut report = ExamReport::new(&dir.name);

    for page in &pages {
        let record = classifier.classify(page);
        debug!(
            "[试卷 {}] page_{} → {} {}",
            dir.name, record.page_no, record.status, record.note
        );
        report.push(record);
    }

    info!("\n{}", report.render_table());
    log_exam_complete(&report);
    Ok(report)
}

fn log_exam_complete(report: &ExamReport) {
    if report.passed() {
        info!(
            "[试卷 {}] ✓ 完整性验证通过 ({} 页, {} 题)",
            report.exam_dir_name, report.pages_scanned, report.total_questions
        );
    } else {
        info!(
            "[试卷 {}] ⚠ 发现 {} 个问题",
            report.exam_dir_name,
            report.issues.len()
        );
    }
}
