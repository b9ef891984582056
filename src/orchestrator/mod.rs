//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 持有配置、扫描器、分类器和中断标记
//! - 解析目标目录（显式目录 / 指针文件 / 全部）
//! - 批量同步、批量检查，输出全局统计
//!
//! ### `exam_processor` - 单份试卷检查
//! - 遍历一份试卷的所有页面并分类
//! - 输出该试卷的报告表格
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ExamDir>)
//!     ↓                         ↓
//! workflow::ReconciliationEngine   exam_processor (处理 Vec<PageArtifacts>)
//!     ↓                         ↓
//! services (能力层：scanner / classifier / name_resolver / report)
//!     ↓
//! infrastructure (基础设施：ExamStore)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，exam_processor 管单份试卷
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;
pub mod exam_processor;

// 重新导出主要类型
pub use batch_processor::{App, SyncSummary};
pub use exam_processor::verify_exam;
