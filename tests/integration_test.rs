use exam_sync::infrastructure::ExamStore;
use exam_sync::{App, Config, PageStatus, ReconcileOutcome, SkipReason, SqliteStore};
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

async fn setup_store() -> SqliteStore {
    let store = SqliteStore::in_memory().await.expect("打开内存库失败");
    store.init_schema().await.expect("建表失败");
    store
}

fn app_for(root: &Path) -> App {
    App::new(Config {
        artifacts_root: root.to_path_buf(),
        ..Config::default()
    })
}

/// 在根目录下创建一份试卷的汇总题目目录
fn write_aggregate(root: &Path, exam: &str, files: &[&str]) {
    let agg = root.join(exam).join("all_questions");
    fs::create_dir_all(&agg).unwrap();
    for f in files {
        fs::write(agg.join(f), b"png").unwrap();
    }
}

/// 写一页：页面图、meta.json（`None` 表示未处理）和裁剪图
fn write_page(root: &Path, exam: &str, page: &str, meta: Option<&str>, crops: &[&str]) {
    let exam_dir = root.join(exam);
    fs::create_dir_all(&exam_dir).unwrap();
    fs::write(exam_dir.join(format!("page_{page}.png")), b"png").unwrap();

    let Some(meta) = meta else { return };
    let page_dir = exam_dir.join(format!("questions_page_{page}"));
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(page_dir.join("meta.json"), meta).unwrap();
    for crop in crops {
        fs::write(page_dir.join(crop), b"png").unwrap();
    }
}

/// 试卷行（不含 id 和 updated_at）及其题目行
type ExamSnapshot = (String, String, i64, String, Vec<(i64, String, String)>);

/// 用于比较的存储快照
async fn snapshot(store: &SqliteStore) -> Vec<ExamSnapshot> {
    let mut rows = Vec::new();
    for exam in store.list_exams().await.unwrap() {
        let questions = store
            .list_questions(exam.id)
            .await
            .unwrap()
            .into_iter()
            .map(|q| (q.question_no, q.image_filename, q.created_at))
            .collect();
        rows.push((
            exam.exam_dir_name,
            exam.display_name,
            exam.question_count,
            exam.created_at,
            questions,
        ));
    }
    rows
}

#[tokio::test]
async fn test_sync_all_mixed_directories() {
    let root = TempDir::new().unwrap();
    write_aggregate(
        root.path(),
        "examA__ab12cd34",
        &[
            "q1.png",
            "q2.png",
            "q3.png",
            "q4.png",
            "q5.PNG",
            "data_analysis_1.png",
            "notes.txt",
        ],
    );
    write_aggregate(root.path(), "examB", &["readme.txt"]);
    fs::create_dir_all(root.path().join("bare")).unwrap();
    fs::write(root.path().join(".last_processed"), "examA__ab12cd34").unwrap();

    let store = setup_store().await;
    let app = app_for(root.path());
    let summary = app.run_sync(&store, None, false).await.unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.success());

    let outcomes: Vec<(&str, ReconcileOutcome)> = summary
        .reports
        .iter()
        .map(|r| (r.exam_dir_name.as_str(), r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (
                "bare",
                ReconcileOutcome::Skipped(SkipReason::MissingAggregateDir)
            ),
            ("examA__ab12cd34", ReconcileOutcome::Created),
            ("examB", ReconcileOutcome::Skipped(SkipReason::NoQuestions)),
        ]
    );

    let exam = store.fetch_exam("examA__ab12cd34").await.unwrap().unwrap();
    assert_eq!(exam.display_name, "examA");
    assert_eq!(exam.question_count, 5);
    assert_eq!(store.list_questions(exam.id).await.unwrap().len(), 5);
    assert!(store.fetch_exam("examB").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sync_twice_is_idempotent() {
    let root = TempDir::new().unwrap();
    let files = ["q1.png", "q2.png", "q3.png"];
    write_aggregate(root.path(), "examA__ab12cd34", &files);
    write_aggregate(root.path(), "examB", &["q10.png", "q2.png"]);

    let store = setup_store().await;
    let app = app_for(root.path());

    let first = app.run_sync(&store, None, false).await.unwrap();
    assert_eq!(first.created, 2);
    let before = snapshot(&store).await;

    let second = app.run_sync(&store, None, false).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 2);
    assert!(second.reports.iter().all(|r| r.new_question_rows == 0));

    assert_eq!(snapshot(&store).await, before);
}

#[tokio::test]
async fn test_uniqueness_holds_after_repeated_syncs() {
    let root = TempDir::new().unwrap();
    write_aggregate(root.path(), "examA", &["q1.png", "q2.png"]);
    write_aggregate(root.path(), "examA__ab12cd34", &["q1.png"]);

    let store = setup_store().await;
    let app = app_for(root.path());
    for _ in 0..3 {
        app.run_sync(&store, None, false).await.unwrap();
    }

    let duplicate_exams: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT exam_dir_name FROM exams \
         GROUP BY exam_dir_name HAVING COUNT(*) > 1)",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();
    let duplicate_questions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT exam_id, question_no FROM exam_questions \
         GROUP BY exam_id, question_no HAVING COUNT(*) > 1)",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();

    assert_eq!(duplicate_exams, 0);
    assert_eq!(duplicate_questions, 0);
    // 两个目录解析为同一展示名，但身份按目录名区分
    assert_eq!(store.list_exams().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_directory_rolls_back_and_batch_continues() {
    let root = TempDir::new().unwrap();
    write_aggregate(root.path(), "a_bad", &["q1.png", "q2.png", "q3.png"]);
    write_aggregate(root.path(), "b_good", &["q1.png", "q2.png"]);

    let store = setup_store().await;
    // a_bad 的第 3 题写入时失败，此前的试卷行和题目行已在同一事务内写入
    sqlx::query(
        r#"
        CREATE TRIGGER reject_a_bad_q3 BEFORE INSERT ON exam_questions
        WHEN NEW.question_no = 3
            AND NEW.exam_id = (SELECT id FROM exams WHERE exam_dir_name = 'a_bad')
        BEGIN
            SELECT RAISE(ABORT, 'question 3 rejected');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let app = app_for(root.path());
    let summary = app.run_sync(&store, None, false).await.unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.success());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "a_bad");

    assert!(store.fetch_exam("a_bad").await.unwrap().is_none());
    let good = store.fetch_exam("b_good").await.unwrap().unwrap();
    assert_eq!(good.question_count, 2);

    let question_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(question_rows, 2);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let root = TempDir::new().unwrap();
    write_aggregate(root.path(), "examA", &["q1.png", "q2.png"]);

    let store = setup_store().await;
    let app = app_for(root.path());
    let summary = app.run_sync(&store, None, true).await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.reports[0].new_question_rows, 2);
    assert!(store.list_exams().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_single_target() {
    let root = TempDir::new().unwrap();
    write_aggregate(root.path(), "examA", &["q1.png"]);
    write_aggregate(root.path(), "examB", &["q1.png"]);

    let store = setup_store().await;
    let app = app_for(root.path());

    let summary = app
        .run_sync(&store, Some(Path::new("examB")), false)
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    assert!(store.fetch_exam("examA").await.unwrap().is_none());
    assert!(store.fetch_exam("examB").await.unwrap().is_some());

    let missing = app.run_sync(&store, Some(Path::new("nope")), false).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_cancel_before_run_processes_nothing() {
    let root = TempDir::new().unwrap();
    write_aggregate(root.path(), "examA", &["q1.png"]);

    let store = setup_store().await;
    let app = app_for(root.path());
    app.cancel_handle().store(true, Ordering::SeqCst);

    let summary = app.run_sync(&store, None, false).await.unwrap();
    assert!(summary.interrupted);
    assert!(!summary.success());
    assert!(summary.reports.is_empty());
    assert!(store.list_exams().await.unwrap().is_empty());
}

#[test]
fn test_verify_latest_via_pointer_file() {
    let root = TempDir::new().unwrap();
    write_page(
        root.path(),
        "examA",
        "001",
        Some(r#"{"questions":[{"qno":1},{"qno":2}]}"#),
        &["q1.png", "q2.png"],
    );
    let empty = r#"{"questions":[]}"#;
    write_page(root.path(), "examA", "002", Some(empty), &[]);
    fs::write(root.path().join(".last_processed"), "examA\n").unwrap();

    let app = app_for(root.path());
    let summary = app.run_verify(None, false).unwrap();

    assert_eq!(summary.reports.len(), 1);
    let report = &summary.reports[0];
    assert_eq!(report.exam_dir_name, "examA");
    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.total_questions, 2);
    assert!(report.issues.is_empty());
    assert!(summary.passed());
}

#[test]
fn test_verify_missing_pointer_is_error() {
    let root = TempDir::new().unwrap();
    let app = app_for(root.path());
    assert!(app.run_verify(None, false).is_err());
}

#[test]
fn test_verify_all_reports_issues() {
    let root = TempDir::new().unwrap();
    let one_question = r#"{"questions":[{"qno":1}]}"#;
    write_page(root.path(), "good", "001", Some(one_question), &["q1.png"]);
    write_page(
        root.path(),
        "bad",
        "001",
        Some(r#"{"questions":[{"qno":1},{"qno":2},{"qno":3}]}"#),
        &["q1.png", "q2.png"],
    );
    write_page(root.path(), "bad", "002", Some("{not json"), &[]);
    write_page(root.path(), "bad", "003", None, &[]);

    let app = app_for(root.path());
    let summary = app.run_verify(None, true).unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert!(!summary.passed());
    assert_eq!(summary.failed_exams(), 1);

    let bad = summary
        .reports
        .iter()
        .find(|r| r.exam_dir_name == "bad")
        .unwrap();
    let statuses: Vec<PageStatus> = bad.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![PageStatus::Warning, PageStatus::Corrupt, PageStatus::NotProcessed]
    );
    assert_eq!(bad.issues.len(), 3);
    assert_eq!(bad.pages_processed, 1);
}
