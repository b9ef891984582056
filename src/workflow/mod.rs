pub mod reconcile_flow;

pub use reconcile_flow::{ReconcileOutcome, ReconcileReport, ReconciliationEngine};
