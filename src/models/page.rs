//! 单页完整性检查的数据结构
//!
//! `PageArtifacts` 是从磁盘收集到的原始输入，`PageRecord` 是分类结果（不落库）。

use std::fmt;

/// meta.json 的读取情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// 文件不存在
    Absent,
    /// 文件存在但读取失败
    Unreadable(String),
    /// 文件原文
    Present(String),
}

/// 单页在磁盘上的产物
#[derive(Debug, Clone)]
pub struct PageArtifacts {
    /// 页码标签（page_ 之后的部分，如 "003"）
    pub page_no: String,
    pub metadata: MetadataSource,
    /// 该页题目目录下符合命名规则的裁剪图数量
    pub image_count: usize,
}

/// 页面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    NotProcessed,
    Corrupt,
    Ok,
    Warning,
}

impl PageStatus {
    /// 表格中显示的标签
    pub fn label(&self) -> &'static str {
        match self {
            PageStatus::NotProcessed => "未处理",
            PageStatus::Corrupt => "损坏",
            PageStatus::Ok => "✓",
            PageStatus::Warning => "⚠",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageStatus::NotProcessed => "NOT_PROCESSED",
            PageStatus::Corrupt => "CORRUPT",
            PageStatus::Ok => "OK",
            PageStatus::Warning => "WARNING",
        };
        f.write_str(name)
    }
}

/// 分类说明
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNote {
    /// 缺少 meta.json
    MissingMetadata,
    /// meta.json 损坏，附带解析错误
    Corrupt(String),
    /// 空页（无题目），正常终态
    EmptyPage,
    /// 图片少于题目
    MissingImages { expected: usize },
    /// 图片数量超过阈值
    ImageCountAnomaly,
    /// 题号范围
    QuestionRange { min: i64, max: i64 },
    /// 无可用题号
    None,
}

impl fmt::Display for PageNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageNote::MissingMetadata => write!(f, "缺少meta.json"),
            PageNote::Corrupt(detail) => write!(f, "meta.json损坏: {}", detail),
            PageNote::EmptyPage => write!(f, "空页（无题目）"),
            PageNote::MissingImages { expected } => {
                write!(f, "缺少图片文件 (应有{}张)", expected)
            }
            PageNote::ImageCountAnomaly => write!(f, "图片数量异常"),
            PageNote::QuestionRange { min, max } => write!(f, "Q{}-Q{}", min, max),
            PageNote::None => Ok(()),
        }
    }
}

/// 单页分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub page_no: String,
    pub status: PageStatus,
    /// meta.json 中的题目数；未处理或损坏时未知
    pub question_count: Option<usize>,
    /// 实际图片数；未处理或损坏时未知
    pub image_count: Option<usize>,
    pub note: PageNote,
}

impl PageRecord {
    /// 是否计入问题列表（空页的 OK 不算）
    pub fn is_issue(&self) -> bool {
        self.status != PageStatus::Ok
    }

    /// 问题列表中的简述
    pub fn issue_summary(&self) -> Option<String> {
        let reason = match (&self.status, &self.note) {
            (PageStatus::Ok, _) => return None,
            (PageStatus::NotProcessed, _) => "未处理",
            (PageStatus::Corrupt, _) => "meta.json损坏",
            (PageStatus::Warning, PageNote::MissingImages { .. }) => "缺少图片",
            (PageStatus::Warning, _) => "图片数量异常",
        };
        Some(format!("page_{}: {}", self.page_no, reason))
    }
}
