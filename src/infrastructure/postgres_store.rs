//! PostgreSQL 适配器
//!
//! 语句与 SQLite 版一致，只有占位符（`$n`）和建表语句不同。

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::database_url::NetworkUrl;
use crate::infrastructure::store::{ExamStore, StoreTransaction};
use crate::models::exam::{Exam, ExamQuestion, NewExam};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

const DEFAULT_PORT: u16 = 5432;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS exams (
        id BIGSERIAL PRIMARY KEY,
        exam_dir_name TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        question_count BIGINT NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        processed_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exam_questions (
        id BIGSERIAL PRIMARY KEY,
        exam_id BIGINT NOT NULL REFERENCES exams(id) ON DELETE CASCADE,
        question_no BIGINT NOT NULL,
        image_filename TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(exam_id, question_no)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_exam_questions_exam_id ON exam_questions(exam_id)",
];

/// PostgreSQL 存储
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按解析后的 URL 建立连接池
    pub async fn connect(url: &NetworkUrl) -> StoreResult<Self> {
        let host = url.host.as_deref().unwrap_or("localhost");
        let port = url.port.unwrap_or(DEFAULT_PORT);

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(&url.database);
        if let Some(username) = &url.username {
            options = options.username(username);
        }
        if let Some(password) = &url.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::ConnectFailed {
                target: format!("{}:{}/{}", host, port, url.database),
                source,
            })?;

        Ok(Self::new(pool))
    }
}

impl ExamStore for PostgresStore {
    type Tx = PostgresTransaction;

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
        Ok(PostgresTransaction { tx })
    }

    async fn fetch_exam(&self, exam_dir_name: &str) -> StoreResult<Option<Exam>> {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT id, exam_dir_name, display_name, question_count,
                   created_at, updated_at, processed_at
            FROM exams
            WHERE exam_dir_name = $1
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
            WHERE exam_id = $1
            ORDER BY question_no
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::query("list_questions", e))
    }
}

/// PostgreSQL 写事务
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl StoreTransaction for PostgresTransaction {
    async fn find_exam_by_dir(&mut self, exam_dir_name: &str) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE exam_dir_name = $1")
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
            VALUES ($1, $2, $3, $4, $4, $4)
            ON CONFLICT (exam_dir_name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(exam.exam_dir_name)
        .bind(exam.display_name)
        .bind(exam.question_count)
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
        sqlx::query("UPDATE exams SET question_count = $1, updated_at = $2 WHERE id = $3")
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
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (exam_id, question_no) DO NOTHING
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
