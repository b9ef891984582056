use serde::Serialize;

/// 已入库的试卷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Exam {
    pub id: i64,
    /// 源目录名，全局唯一，创建后不变
    pub exam_dir_name: String,
    /// 去掉哈希后缀的显示名
    pub display_name: String,
    /// 题目数缓存
    pub question_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

/// 试卷下的一道题目，写入后不再更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ExamQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question_no: i64,
    pub image_filename: String,
    pub created_at: String,
}

/// 新建试卷记录所需字段
#[derive(Debug, Clone)]
pub struct NewExam<'a> {
    pub exam_dir_name: &'a str,
    pub display_name: &'a str,
    pub question_count: i64,
    /// created_at / updated_at / processed_at 统一使用该时间
    pub now: &'a str,
}

/// 试卷目录被跳过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// 缺少汇总题目目录
    MissingAggregateDir,
    /// 汇总目录中没有合法题目文件
    NoQuestions,
    /// 写入时遇到唯一约束冲突，说明已被其他写入方同步
    AlreadyReconciled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::MissingAggregateDir => "缺少汇总题目目录",
            SkipReason::NoQuestions => "无题目",
            SkipReason::AlreadyReconciled => "已同步",
        };
        f.write_str(text)
    }
}

/// 当前 UTC 时间，ISO-8601 文本（微秒精度）
pub fn now_iso8601() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso8601_shape() {
        let now = now_iso8601();
        assert!(now.ends_with('Z'));
        assert!(chrono::NaiveDateTime::parse_from_str(
            now.trim_end_matches('Z'),
            "%Y-%m-%dT%H:%M:%S%.6f"
        )
        .is_ok());
    }
}
