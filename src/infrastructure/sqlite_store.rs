//! SQLite 适配器

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::store::{ExamStore, StoreTransaction};
use crate::models::exam::{Exam, ExamQuestion, NewExam};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS exams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exam_dir_name TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        question_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        processed_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exam_questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exam_id INTEGER NOT NULL REFERENCES exams(id) ON DELETE CASCADE,
        question_no INTEGER NOT NULL,
        image_filename TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(exam_id, question_no)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_exam_questions_exam_id ON exam_questions(exam_id)",
];

/// SQLite 存储
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 使用已有连接池
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 打开数据库文件，不存在则创建（连同父目录）
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::PrepareFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::ConnectFailed {
                target: path.display().to_string(),
                source,
            })?;

        Ok(Self::new(pool))
    }

    /// 内存库，单连接且不回收，库的生命周期与连接池一致
    pub async fn in_memory() -> StoreResult<Self> {
        let connect_failed = |source| StoreError::ConnectFailed {
            target: "sqlite::memory:".to_string(),
            source,
        };

        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(connect_failed)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(connect_failed)?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ExamStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::query("init_schema", e))?;
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::query("begin", e))?;
        Ok(SqliteTransaction { tx })
    }

    async fn fetch_exam(&self, exam_dir_name: &str) -> StoreResult<Option<Exam>> {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT id, exam_dir_name, display_name, question_count,
                   created_at, updated_at, processed_at
            FROM exams
            WHERE exam_dir_name = ?
            "#,
        )
        .bind(exam_dir_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::query("fetch_exam", e))
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT id, exam_dir_name, display_name, question_count,
                   created_at, updated_at, processed_at
            FROM exams
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("list_exams", e))
    }

    async fn list_questions(&self, exam_id: i64) -> StoreResult<Vec<ExamQuestion>> {
        sqlx::query_as::<_, ExamQuestion>(
            r#"
            SELECT id, exam_id, question_no, image_filename, created_at
            FROM exam_questions
            WHERE exam_id = ?
            ORDER BY question_no
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("list_questions", e))
    }
}

/// SQLite 写事务
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTransaction for SqliteTransaction {
    async fn find_exam_by_dir(&mut self, exam_dir_name: &str) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE exam_dir_name = ?")
            .bind(exam_dir_name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::query("find_exam_by_dir", e))
    }

    async fn insert_exam(&mut self, exam: &NewExam<'_>) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO exams
                (exam_dir_name, display_name, question_count, created_at, updated_at, processed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(exam_dir_name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(exam.exam_dir_name)
        .bind(exam.display_name)
        .bind(exam.question_count)
        .bind(exam.now)
        .bind(exam.now)
        .bind(exam.now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| StoreError::query("insert_exam", e))
    }

    async fn touch_exam(
        &mut self,
        exam_id: i64,
        question_count: i64,
        now: &str,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE exams SET question_count = ?, updated_at = ? WHERE id = ?")
            .bind(question_count)
            .bind(now)
            .bind(exam_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StoreError::query("touch_exam", e))?;
        Ok(())
    }

    async fn insert_question(
        &mut self,
        exam_id: i64,
        question_no: i64,
        image_filename: &str,
        now: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO exam_questions (exam_id, question_no, image_filename, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(exam_id, question_no) DO NOTHING
            "#,
        )
        .bind(exam_id)
        .bind(question_no)
        .bind(image_filename)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::query("insert_question", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::query("commit", e))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::query("rollback", e))
    }
}
