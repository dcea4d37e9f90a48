pub mod cache;
pub mod diagnostics;
pub mod eigen;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod operators;
pub mod pipeline;
pub mod signature;
pub mod verify;

pub use cache::{CacheMetadata, SpectrumCache};
pub use diagnostics::Diagnostics;
pub use eigen::{EigenDecomposition, SpectralConfig, SpectrumReport};
pub use error::{HksError, HksResult};
pub use mesh::{HalfEdgeMesh, MeshLoader, Primitives, RawMesh, SurfaceMesh};
pub use operators::{LaplaceBeltrami, SparseOperator, SymmetrizedOperator, VertexArea};
pub use pipeline::{
    HksWorkflow, MeshPreprocessor, PipelineConfig, PreprocessedMesh, SignatureSummary,
    WorkflowStats,
};
pub use signature::{DescriptorConfig, DescriptorWriter, HeatKernelSignature, HksDescriptor};
pub use verify::{OperatorVerifier, SpectrumVerifier, VerificationReport};
