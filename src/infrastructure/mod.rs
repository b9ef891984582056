//! 基础设施层：数据库访问
//!
//! `DatabaseUrl` 的方言决定使用哪个适配器，上层只依赖 `ExamStore` / `StoreTransaction`。

pub mod database_url;
pub mod postgres_store;
pub mod sqlite_store;
pub mod store;

pub use database_url::{DatabaseUrl, NetworkUrl};
pub use postgres_store::PostgresStore;
pub use sqlite_store::SqliteStore;
pub use store::{ExamStore, StoreTransaction};

use crate::error::{StoreError, StoreResult};
use tracing::info;

/// 按方言打开的存储
pub enum Backend {
    Sqlite(SqliteStore),
    Postgres(PostgresStore),
}

/// 解析 URL，连接对应方言并建表
pub async fn open_backend(raw_url: &str) -> StoreResult<Backend> {
    let url = DatabaseUrl::parse(raw_url)?;
    info!("🗄️ 连接数据库 [{}]: {}", url.dialect(), url.redacted());

    let backend = match &url {
        DatabaseUrl::Sqlite { path: Some(path) } => Backend::Sqlite(SqliteStore::open(path).await?),
        DatabaseUrl::Sqlite { path: None } => Backend::Sqlite(SqliteStore::in_memory().await?),
        DatabaseUrl::Network(n) if is_postgres(url.dialect()) => {
            Backend::Postgres(PostgresStore::connect(n).await?)
        }
        DatabaseUrl::Network(_) => {
            return Err(StoreError::UnsupportedDialect {
                dialect: url.dialect().to_string(),
            })
        }
    };

    match &backend {
        Backend::Sqlite(store) => store.init_schema().await?,
        Backend::Postgres(store) => store.init_schema().await?,
    }

    Ok(backend)
}

fn is_postgres(dialect: &str) -> bool {
    matches!(dialect, "postgres" | "postgresql")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let backend = open_backend("sqlite::memory:").await.unwrap();
        let Backend::Sqlite(store) = backend else {
            panic!("expected sqlite backend");
        };
        assert!(store.list_exams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_dialect() {
        let result = open_backend("mysql://root@localhost/exams").await;
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedDialect { dialect }) if dialect == "mysql"
        ));
    }

    #[test]
    fn test_postgres_dialect_names() {
        assert!(is_postgres("postgres"));
        assert!(is_postgres("postgresql"));
        assert!(!is_postgres("mysql"));
        assert!(!is_postgres("sqlite"));
    }
}
