use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "exam_sync.toml";

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 试卷产物根目录（每个子目录是一份试卷）
    pub artifacts_root: PathBuf,
    /// 数据库连接 URL，scheme 决定方言
    pub database_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 图片数量异常阈值：图片数 > 题目数 × 该倍数 视为异常
    pub anomaly_ratio: usize,
    /// 记录最近处理试卷名的指针文件（位于根目录下）
    pub pointer_file: String,
    /// 汇总题目图片目录名
    pub aggregate_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_root: PathBuf::from("pdf_images"),
            database_url: "sqlite://data/tasks.db".to_string(),
            verbose_logging: false,
            anomaly_ratio: 2,
            pointer_file: ".last_processed".to_string(),
            aggregate_dir: "all_questions".to_string(),
        }
    }
}

/// TOML 配置文件内容，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    artifacts_root: Option<PathBuf>,
    database_url: Option<String>,
    verbose_logging: Option<bool>,
    anomaly_ratio: Option<usize>,
    pointer_file: Option<String>,
    aggregate_dir: Option<String>,
}

impl Config {
    /// 按 默认值 ← 配置文件 ← 环境变量 的顺序加载
    ///
    /// 配置文件路径取 `EXAM_SYNC_CONFIG`，未设置时尝试当前目录下的 `exam_sync.toml`，
    /// 不存在则跳过。
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var("EXAM_SYNC_CONFIG").ok().map(PathBuf::from);
        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺省字段取默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    fn from_toml_str(content: &str, path: &Path) -> AppResult<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            })?;

        let default = Self::default();
        Ok(Self {
            artifacts_root: file.artifacts_root.unwrap_or(default.artifacts_root),
            database_url: file.database_url.unwrap_or(default.database_url),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            anomaly_ratio: file.anomaly_ratio.unwrap_or(default.anomaly_ratio),
            pointer_file: file.pointer_file.unwrap_or(default.pointer_file),
            aggregate_dir: file.aggregate_dir.unwrap_or(default.aggregate_dir),
        })
    }

    /// 用环境变量覆盖
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(v) = std::env::var("ARTIFACTS_ROOT") {
            self.artifacts_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = parse_env::<bool>("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = parse_env::<usize>("ANOMALY_RATIO", "usize")? {
            self.anomaly_ratio = v;
        }
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if self.anomaly_ratio == 0 {
            return Err(ConfigError::InvalidValue {
                key: "anomaly_ratio".to_string(),
                reason: "必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// 指针文件完整路径
    pub fn pointer_path(&self) -> PathBuf {
        self.artifacts_root.join(&self.pointer_file)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
