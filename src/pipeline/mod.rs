pub mod preprocess;
pub mod workflow;

pub use preprocess::{MeshPreprocessor, PreparedSpectrum, PreprocessedMesh, SpectrumSource};
pub use workflow::{BatchStats, HksWorkflow, PipelineConfig, SignatureSummary, WorkflowStats};
