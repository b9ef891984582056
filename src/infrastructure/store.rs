//! 存储抽象 - 基础设施层
//!
//! 同步逻辑只通过这两个 trait 访问数据库，不认识具体方言。
//! 一个试卷目录的所有写入都在同一个 `StoreTransaction` 内完成。

#![allow(async_fn_in_trait)]

use crate::error::StoreResult;
use crate::models::exam::{Exam, ExamQuestion, NewExam};

/// 数据库（连接池）
pub trait ExamStore {
    type Tx: StoreTransaction;

    /// 幂等建表
    async fn init_schema(&self) -> StoreResult<()>;

    /// 开启一个写事务
    async fn begin(&self) -> StoreResult<Self::Tx>;

    /// 按目录名读取试卷
    async fn fetch_exam(&self, exam_dir_name: &str) -> StoreResult<Option<Exam>>;

    /// 所有试卷，按 id 排序
    async fn list_exams(&self) -> StoreResult<Vec<Exam>>;

    /// 某份试卷的题目，按题号排序
    async fn list_questions(&self, exam_id: i64) -> StoreResult<Vec<ExamQuestion>>;
}

/// 一个目录的写事务
///
/// 丢弃前未提交的事务视为回滚。
pub trait StoreTransaction: Sized {
    /// 按目录名查找试卷 id
    async fn find_exam_by_dir(&mut self, exam_dir_name: &str) -> StoreResult<Option<i64>>;

    /// 插入试卷；目录名已存在时不写入并返回 `None`
    async fn insert_exam(&mut self, exam: &NewExam<'_>) -> StoreResult<Option<i64>>;

    /// 刷新题目数和更新时间
    async fn touch_exam(
        &mut self,
        exam_id: i64,
        question_count: i64,
        now: &str,
    ) -> StoreResult<()>;

    /// 插入题目；`(exam_id, question_no)` 已存在时不写入并返回 `false`
    async fn insert_question(
        &mut self,
        exam_id: i64,
        question_no: i64,
        image_filename: &str,
        now: &str,
    ) -> StoreResult<bool>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
