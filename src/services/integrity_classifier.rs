//! 单页完整性分类 - 业务能力层
//!
//! 输入一页的 meta.json 原文和实际图片数，输出唯一状态。纯函数，不做 I/O，不会失败。
//!
//! 规则按顺序匹配，命中即止：
//! 1. 无 meta.json → NOT_PROCESSED
//! 2. meta.json 不是合法结构 → CORRUPT
//! 3. 题目数为 0 → OK（空页）
//! 4. 图片数 < 题目数 → WARNING（缺少图片）
//! 5. 图片数 > 题目数 × 倍数 → WARNING（数量异常，倍数用于容纳跨页题的续图）
//! 6. 其余 → OK，说明为题号范围

use crate::models::page::{MetadataSource, PageArtifacts, PageNote, PageRecord, PageStatus};
use serde_json::Value as JsonValue;

/// 默认异常倍数
pub const DEFAULT_ANOMALY_RATIO: usize = 2;

/// 完整性分类器
#[derive(Debug, Clone, Copy)]
pub struct IntegrityClassifier {
    anomaly_ratio: usize,
}

impl Default for IntegrityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_RATIO)
    }
}

/// meta.json 中与分类相关的内容
struct ParsedMetadata {
    question_count: usize,
    question_numbers: Vec<i64>,
}

impl IntegrityClassifier {
    pub fn new(anomaly_ratio: usize) -> Self {
        Self { anomaly_ratio }
    }

    /// 对单页分类
    pub fn classify(&self, page: &PageArtifacts) -> PageRecord {
        let raw = match &page.metadata {
            MetadataSource::Absent => {
                return uncounted(page, PageStatus::NotProcessed, PageNote::MissingMetadata);
            }
            MetadataSource::Unreadable(detail) => {
                let note = PageNote::Corrupt(detail.clone());
                return uncounted(page, PageStatus::Corrupt, note);
            }
            MetadataSource::Present(raw) => raw,
        };

        let parsed = match parse_metadata(raw) {
            Ok(parsed) => parsed,
            Err(detail) => return uncounted(page, PageStatus::Corrupt, PageNote::Corrupt(detail)),
        };

        let question_count = parsed.question_count;
        let image_count = page.image_count;

        let (status, note) = if question_count == 0 {
            (PageStatus::Ok, PageNote::EmptyPage)
        } else if image_count < question_count {
            (
                PageStatus::Warning,
                PageNote::MissingImages {
                    expected: question_count,
                },
            )
        } else if image_count > question_count.saturating_mul(self.anomaly_ratio) {
            (PageStatus::Warning, PageNote::ImageCountAnomaly)
        } else {
            (PageStatus::Ok, question_range(&parsed.question_numbers))
        };

        PageRecord {
            page_no: page.page_no.clone(),
            status,
            question_count: Some(question_count),
            image_count: Some(image_count),
            note,
        }
    }
}

/// 没有可信题目数的页面（未处理、损坏），不报告数量
fn uncounted(page: &PageArtifacts, status: PageStatus, note: PageNote) -> PageRecord {
    PageRecord {
        page_no: page.page_no.clone(),
        status,
        question_count: None,
        image_count: None,
        note,
    }
}

/// 解析 meta.json
///
/// 顶层必须是对象；`questions` 缺省视为空，存在时必须是数组。
fn parse_metadata(raw: &str) -> Result<ParsedMetadata, String> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| format!("JSON格式错误: {}", e))?;

    let object = value.as_object().ok_or_else(|| "顶层不是对象".to_string())?;

    let questions = match object.get("questions") {
        None | Some(JsonValue::Null) => {
            return Ok(ParsedMetadata {
                question_count: 0,
                question_numbers: Vec::new(),
            })
        }
        Some(JsonValue::Array(items)) => items,
        Some(_) => return Err("questions 不是数组".to_string()),
    };

    let question_numbers = questions
        .iter()
        .filter_map(|q| q.get("qno"))
        .filter_map(JsonValue::as_i64)
        .filter(|qno| *qno > 0)
        .collect();

    Ok(ParsedMetadata {
        question_count: questions.len(),
        question_numbers,
    })
}

fn question_range(numbers: &[i64]) -> PageNote {
    match (numbers.iter().min(), numbers.iter().max()) {
        (Some(&min), Some(&max)) => PageNote::QuestionRange { min, max },
        _ => PageNote::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(metadata: MetadataSource, image_count: usize) -> PageArtifacts {
        PageArtifacts {
            page_no: "001".to_string(),
            metadata,
            image_count,
        }
    }

    fn meta_with(qnos: &[i64]) -> MetadataSource {
        let questions: Vec<JsonValue> = qnos
            .iter()
            .map(|n| serde_json::json!({ "qno": n, "bbox": [0, 0, 10, 10] }))
            .collect();
        MetadataSource::Present(serde_json::json!({ "questions": questions }).to_string())
    }

    #[test]
    fn test_missing_metadata_is_not_processed() {
        let record = IntegrityClassifier::default().classify(&page(MetadataSource::Absent, 3));
        assert_eq!(record.status, PageStatus::NotProcessed);
        assert_eq!(record.question_count, None);
        assert_eq!(record.image_count, None);
        assert!(record.is_issue());
    }

    #[test]
    fn test_malformed_metadata_is_corrupt() {
        let classifier = IntegrityClassifier::default();
        for raw in ["{\"questions\": [", "[1, 2, 3]", "{\"questions\": 3}", ""] {
            let record = classifier.classify(&page(MetadataSource::Present(raw.to_string()), 0));
            assert_eq!(record.status, PageStatus::Corrupt, "raw: {raw}");
            assert!(matches!(record.note, PageNote::Corrupt(_)));
        }

        let unreadable = classifier.classify(&page(MetadataSource::Unreadable("denied".into()), 0));
        assert_eq!(unreadable.status, PageStatus::Corrupt);
    }

    #[test]
    fn test_empty_page_is_ok_and_not_an_issue() {
        let record = IntegrityClassifier::default().classify(&page(meta_with(&[]), 0));
        assert_eq!(record.status, PageStatus::Ok);
        assert_eq!(record.note, PageNote::EmptyPage);
        assert!(!record.is_issue());

        // 没有 questions 字段也视为空页
        let record = IntegrityClassifier::default()
            .classify(&page(MetadataSource::Present("{}".to_string()), 0));
        assert_eq!(record.note, PageNote::EmptyPage);
    }

    #[test]
    fn test_missing_images_is_warning() {
        let record = IntegrityClassifier::default().classify(&page(meta_with(&[1, 2, 3]), 2));
        assert_eq!(record.status, PageStatus::Warning);
        assert_eq!(record.note, PageNote::MissingImages { expected: 3 });
        assert_eq!(record.question_count, Some(3));
        assert_eq!(record.image_count, Some(2));
        assert!(record.is_issue());
    }

    #[test]
    fn test_anomaly_boundary() {
        let classifier = IntegrityClassifier::default();

        let at_limit = classifier.classify(&page(meta_with(&[4, 5]), 4));
        assert_eq!(at_limit.status, PageStatus::Ok);
        assert_eq!(at_limit.note, PageNote::QuestionRange { min: 4, max: 5 });

        let over_limit = classifier.classify(&page(meta_with(&[4, 5]), 5));
        assert_eq!(over_limit.status, PageStatus::Warning);
        assert_eq!(over_limit.note, PageNote::ImageCountAnomaly);
    }

    #[test]
    fn test_custom_ratio() {
        let record = IntegrityClassifier::new(3).classify(&page(meta_with(&[1, 2]), 6));
        assert_eq!(record.status, PageStatus::Ok);
    }

    #[test]
    fn test_range_ignores_unusable_qno() {
        let raw = r#"{"questions":[{"qno":7},{"qno":null},{"text":"x"},{"qno":"9"},{"qno":3}]}"#;
        let record = IntegrityClassifier::default()
            .classify(&page(MetadataSource::Present(raw.to_string()), 5));
        assert_eq!(record.question_count, Some(5));
        assert_eq!(record.status, PageStatus::Ok);
        assert_eq!(record.note, PageNote::QuestionRange { min: 3, max: 7 });

        let raw = r#"{"questions":[{"text":"x"}]}"#;
        let record = IntegrityClassifier::default()
            .classify(&page(MetadataSource::Present(raw.to_string()), 1));
        assert_eq!(record.note, PageNote::None);
    }

    #[test]
    fn test_totality_grid() {
        let classifier = IntegrityClassifier::default();
        let sources = [
            MetadataSource::Absent,
            MetadataSource::Unreadable("io".into()),
            MetadataSource::Present("garbage".into()),
            meta_with(&[]),
            meta_with(&[1]),
            meta_with(&[1, 2, 3]),
        ];
        for source in sources {
            for images in [0usize, 1, 3, 6, 7, usize::MAX] {
                let record = classifier.classify(&page(source.clone(), images));
                assert_eq!(record.page_no, "001");
            }
        }
    }
}
