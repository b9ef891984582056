pub mod directory_scanner;
pub mod integrity_classifier;
pub mod name_resolver;
pub mod report;

pub use directory_scanner::{Candidate, DirectoryScanner, ExamDir, QuestionFile};
pub use integrity_classifier::IntegrityClassifier;
pub use report::{ExamReport, VerifySummary};
