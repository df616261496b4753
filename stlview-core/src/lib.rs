/// stlview core library - stateless geometry and asset logic
///
/// Provides the mesh types, STL parsing, orbit camera, hemispheric
/// lighting and transform helpers shared by every stlview backend.
/// Nothing in this crate performs I/O or holds viewer state.

pub mod camera;
pub mod geometry;
pub mod lighting;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use camera::OrbitCamera;
pub use geometry::{Aabb, Triangle, TriangleMesh, Vertex};
pub use lighting::HemisphericLight;
pub use stl::{parse_stl, StlError};
pub use transform::{RotationState, Transform};
