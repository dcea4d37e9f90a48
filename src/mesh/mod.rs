pub mod construction;
pub mod model;
pub mod primitives;

pub use construction::MeshLoader;
pub use model::{FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh, RawMesh, SurfaceMesh, VertexId};
pub use primitives::Primitives;
