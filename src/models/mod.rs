pub mod exam;
pub mod loaders;
pub mod page;

pub use exam::{now_iso8601, Exam, ExamQuestion, NewExam, SkipReason};
pub use loaders::{load_metadata, read_pointer};
pub use page::{MetadataSource, PageArtifacts, PageNote, PageRecord, PageStatus};
