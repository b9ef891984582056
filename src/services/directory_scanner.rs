//! 目录扫描 - 业务能力层
//!
//! 只负责"磁盘上有什么"，不关心数据库，也不做判断。
//!
//! 目录约定：
//!
//! ```text
//! <root>/
//!   .last_processed                  最近处理的试卷目录名
//!   <exam_dir>/
//!     page_003.png                   页面图
//!     questions_page_003/meta.json   该页的题目描述
//!     questions_page_003/q12.png     该页的题目裁剪图（跨页续图为 q12_part2.png）
//!     all_questions/q12.png          汇总题目图
//! ```

use crate::error::{AppError, AppResult, FileError};
use crate::models::exam::SkipReason;
use crate::models::loaders::load_metadata;
use crate::models::page::{MetadataSource, PageArtifacts};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 汇总目录中的题目图：q<题号>.png
static QUESTION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^q(\d+)\.(?i:png)$").expect("题目文件正则非法"));

/// 单页目录中的裁剪图：q<题号>.png 或 q<题号>_part<序号>.png
static PAGE_CROP_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^q\d+(?:_part\d+)?\.(?i:png)$").expect("裁剪图正则非法"));

/// 页面图：page_<页码>.png
static PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page_(.+)\.(?i:png)$").expect("页面文件正则非法"));

/// 一个试卷目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDir {
    pub path: PathBuf,
    /// 目录名，即试卷身份
    pub name: String,
}

impl ExamDir {
    /// 以路径最后一段作为目录名
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path: path.to_path_buf(),
            name,
        }
    }
}

/// 根目录下的候选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// 含汇总题目目录，可同步
    Eligible(ExamDir),
    /// 跳过，附原因
    Ineligible { dir: ExamDir, reason: SkipReason },
}

impl Candidate {
    pub fn dir(&self) -> &ExamDir {
        match self {
            Candidate::Eligible(dir) | Candidate::Ineligible { dir, .. } => dir,
        }
    }
}

/// 汇总目录中解析出的题目文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFile {
    pub question_no: i64,
    pub filename: String,
}

/// 目录扫描器
pub struct DirectoryScanner {
    aggregate_dir: String,
}

impl DirectoryScanner {
    /// 创建扫描器
    ///
    /// # 参数
    /// - `aggregate_dir`: 汇总题目目录名（通常为 `all_questions`）
    pub fn new(aggregate_dir: impl Into<String>) -> Self {
        Self {
            aggregate_dir: aggregate_dir.into(),
        }
    }

    /// 枚举根目录下的试卷目录
    ///
    /// 惰性迭代，按目录名排序；每次调用重新扫描。指向目录的符号链接视为试卷目录。
    /// 根目录不存在时返回错误，单个条目读取失败只记录警告。
    pub fn candidates<'a>(
        &'a self,
        root: &Path,
    ) -> AppResult<impl Iterator<Item = Candidate> + 'a> {
        if !root.is_dir() {
            return Err(AppError::directory_not_found(root));
        }

        let iter = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("读取目录项失败: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(move |entry| self.inspect(entry.path()));

        Ok(iter)
    }

    /// 检查单个目录是否可同步
    pub fn inspect(&self, path: &Path) -> Candidate {
        let dir = ExamDir::from_path(path);
        if path.join(&self.aggregate_dir).is_dir() {
            Candidate::Eligible(dir)
        } else {
            Candidate::Ineligible {
                dir,
                reason: SkipReason::MissingAggregateDir,
            }
        }
    }

    /// 解析汇总目录中的题目文件
    ///
    /// 不符合 `q<题号>.png` 的文件直接忽略；同一题号只保留文件名排序靠前的那个。
    /// 返回结果按题号升序。
    pub fn question_files(&self, exam_dir: &Path) -> AppResult<Vec<QuestionFile>> {
        let aggregate = exam_dir.join(&self.aggregate_dir);
        if !aggregate.is_dir() {
            return Err(AppError::directory_not_found(&aggregate));
        }

        let mut by_no: BTreeMap<i64, String> = BTreeMap::new();
        for entry in WalkDir::new(&aggregate)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| FileError::WalkFailed {
                path: aggregate.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            match parse_question_no(&filename) {
                Some(question_no) => {
                    by_no.entry(question_no).or_insert(filename);
                }
                None => debug!("忽略非题目文件: {}", filename),
            }
        }

        Ok(by_no
            .into_iter()
            .map(|(question_no, filename)| QuestionFile {
                question_no,
                filename,
            })
            .collect())
    }

    /// 收集试卷目录下每一页的产物，按页面文件名排序
    pub fn pages(&self, exam_dir: &Path) -> AppResult<Vec<PageArtifacts>> {
        if !exam_dir.is_dir() {
            return Err(AppError::directory_not_found(exam_dir));
        }

        let mut pages = Vec::new();
        for entry in WalkDir::new(exam_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| FileError::WalkFailed {
                path: exam_dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy();
            let Some(caps) = PAGE_FILE.captures(&filename) else {
                continue;
            };
            let page_no = caps[1].to_string();

            let questions_dir = exam_dir.join(format!("questions_page_{}", page_no));
            let metadata = load_metadata(&questions_dir.join("meta.json"));
            let image_count = match metadata {
                MetadataSource::Absent => 0,
                _ => count_page_crops(&questions_dir),
            };

            pages.push(PageArtifacts {
                page_no,
                metadata,
                image_count,
            });
        }

        Ok(pages)
    }
}

/// 从文件名解析题号，必须为正整数
pub fn parse_question_no(filename: &str) -> Option<i64> {
    let caps = QUESTION_FILE.captures(filename)?;
    caps[1].parse::<i64>().ok().filter(|n| *n > 0)
}

/// 统计单页目录中的裁剪图数量
fn count_page_crops(questions_dir: &Path) -> usize {
    WalkDir::new(questions_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("读取裁剪图失败 {}: {}", questions_dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| PAGE_CROP_FILE.is_match(&entry.file_name().to_string_lossy()))
        .count()
}
