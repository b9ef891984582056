//! # Exam Sync
//!
//! 把试卷处理产物（页面图、题目裁剪图、meta.json）同步进数据库，并检查提取完整性。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有数据库连接池，只暴露能力
//! - `ExamStore` / `StoreTransaction` - 方言无关的存储抽象
//! - `SqliteStore` / `PostgresStore` - 按 URL 方言选择的适配器
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不碰数据库
//! - `DirectoryScanner` - 枚举试卷目录、题目文件、页面产物
//! - `name_resolver` - 目录名 → 展示名
//! - `IntegrityClassifier` - 单页完整性分类
//! - `ExamReport` - 汇总单份试卷的检查结果
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个目录"的完整同步流程
//! - `ReconciliationEngine` - 扫描 → 事务内写入 → 提交/回滚
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量同步与批量检查，处理中断
//! - `orchestrator/exam_processor` - 单份试卷检查
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{open_backend, Backend, ExamStore, SqliteStore};
pub use models::{Exam, ExamQuestion, PageRecord, PageStatus, SkipReason};
pub use orchestrator::{App, SyncSummary};
pub use services::{ExamReport, VerifySummary};
pub use workflow::{ReconcileOutcome, ReconcileReport, ReconciliationEngine};
