//! 检查报告汇总 - 业务能力层
//!
//! 累积一份试卷所有页面的分类结果，给出通过/不通过。

use crate::models::page::{PageRecord, PageStatus};
use std::fmt::Write as _;

/// 单份试卷的完整性报告
#[derive(Debug, Clone, Default)]
pub struct ExamReport {
    pub exam_dir_name: String,
    pub records: Vec<PageRecord>,
    pub pages_scanned: usize,
    pub pages_processed: usize,
    pub total_questions: usize,
    pub issues: Vec<String>,
}

impl ExamReport {
    pub fn new(exam_dir_name: impl Into<String>) -> Self {
        Self {
            exam_dir_name: exam_dir_name.into(),
            ..Default::default()
        }
    }

    /// 加入一页的结果
    pub fn push(&mut self, record: PageRecord) {
        self.pages_scanned += 1;

        if matches!(record.status, PageStatus::Ok | PageStatus::Warning) {
            self.pages_processed += 1;
            self.total_questions += record.question_count.unwrap_or(0);
        }

        if let Some(issue) = record.issue_summary() {
            self.issues.push(issue);
        }

        self.records.push(record);
    }

    /// 未处理页数（含损坏）
    pub fn pages_unprocessed(&self) -> usize {
        self.pages_scanned - self.pages_processed
    }

    /// 问题列表为空即通过
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    /// 渲染逐页表格和总结
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80);

        let _ = writeln!(out, "试卷: {}", self.exam_dir_name);
        let _ = writeln!(out, "总页数: {}", self.pages_scanned);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:<8} {:<8} 说明",
            "页码", "状态", "题目数", "图片数"
        );
        let _ = writeln!(out, "{}", rule);

        for record in &self.records {
            let _ = writeln!(
                out,
                "{:<10} {:<8} {:<8} {:<8} {}",
                record.page_no,
                record.status.label(),
                count_cell(record.question_count),
                count_cell(record.image_count),
                record.note
            );
        }

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "总结:");
        let _ = writeln!(out, "  - 总页数: {}", self.pages_scanned);
        let _ = writeln!(out, "  - 已处理: {} 页", self.pages_processed);
        let _ = writeln!(out, "  - 未处理: {} 页", self.pages_unprocessed());
        let _ = writeln!(out, "  - 总题数: {} 题", self.total_questions);

        if self.passed() {
            let _ = writeln!(out, "✓ 所有已处理页面完整性验证通过");
        } else {
            let _ = writeln!(out, "发现 {} 个问题:", self.issues.len());
            for issue in &self.issues {
                let _ = writeln!(out, "  ⚠ {}", issue);
            }
        }

        out
    }
}

fn count_cell(count: Option<usize>) -> String {
    count.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// 多份试卷检查的汇总
#[derive(Debug, Clone, Default)]
pub struct VerifySummary {
    pub reports: Vec<ExamReport>,
    /// 无法检查的试卷（目录读取失败等）
    pub errors: Vec<String>,
}

impl VerifySummary {
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.reports.iter().all(ExamReport::passed)
    }

    pub fn failed_exams(&self) -> usize {
        self.errors.len() + self.reports.iter().filter(|r| !r.passed()).count()
    }
}
