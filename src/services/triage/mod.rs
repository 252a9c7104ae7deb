pub mod classifier;
pub mod labels;
pub mod pipeline;

pub use classifier::Classifier;
pub use labels::LabelRegistry;
pub use pipeline::{TriagePipeline, TriageReport};
