use std::path::{Path, PathBuf};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 目录不存在
    #[error("目录不存在: {}", path.display())]
    DirectoryNotFound { path: PathBuf },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 遍历目录失败
    #[error("遍历目录失败 ({}): {source}", path.display())]
    WalkFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 数据库URL无法解析
    #[error("无法解析数据库URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// 不支持的数据库方言
    #[error("不支持的数据库方言: {dialect}")]
    UnsupportedDialect { dialect: String },
    /// 连接数据库失败
    #[error("连接数据库失败 ({target}): {source}")]
    ConnectFailed {
        target: String,
        #[source]
        source: sqlx::Error,
    },
    /// 创建数据库目录失败
    #[error("创建数据库目录失败 ({}): {source}", path.display())]
    PrepareFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 语句执行失败
    #[error("{operation} 执行失败: {source}")]
    QueryFailed {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// 包装一次语句执行错误
    pub fn query(operation: &'static str, source: sqlx::Error) -> Self {
        StoreError::QueryFailed { operation, source }
    }

    /// 是否为唯一约束冲突（并发重复写入）
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::QueryFailed {
                source: sqlx::Error::Database(db_err),
                ..
            } => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值非法
    #[error("配置项 {key} 非法: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建目录不存在错误
    pub fn directory_not_found(path: impl AsRef<Path>) -> Self {
        AppError::File(FileError::DirectoryNotFound {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// 是否为"已被其他写入方同步"的唯一约束冲突
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_unique_violation())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 存储层结果类型
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        let err = StoreError::query("insert_exam", sqlx::Error::RowNotFound);
        assert!(!err.is_unique_violation());

        let app: AppError = StoreError::UnsupportedDialect {
            dialect: "mysql".to_string(),
        }
        .into();
        assert!(!app.is_unique_violation());
    }

    #[test]
    fn test_error_messages_carry_path() {
        let err = AppError::directory_not_found("pdf_images/missing");
        assert!(err.to_string().contains("pdf_images/missing"));
    }
}
