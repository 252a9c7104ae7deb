pub mod queue;
pub mod triage;
