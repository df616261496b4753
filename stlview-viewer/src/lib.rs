/// stlview viewer - engine-agnostic single-file mesh viewer component
///
/// The [`Viewer`] binds a scene to a (url, file name) input pair: it mounts
/// a camera, a light and a render loop, and keeps at most one imported mesh
/// set resident, replacing it whenever the inputs change. Everything the
/// viewer needs from a render backend goes through the [`Engine`] trait, so
/// the same lifecycle drives any backend that can import meshes and render.

pub mod engine;
pub mod viewer;

// Re-export commonly used types
pub use engine::{Engine, ImportCompletion, ImportError, ViewerError, ViewportSize};
pub use viewer::{Viewer, ViewerInputs, ViewerPhase};
