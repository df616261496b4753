/// Collaborator contract between the viewer and a render backend
use stlview_core::{HemisphericLight, OrbitCamera};
use thiserror::Error;

/// Logical size of the rendering surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 700,
        }
    }
}

/// Failures fatal to mounting the viewer
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("camera construction failed: {0}")]
    Camera(String),
    #[error("light construction failed: {0}")]
    Light(String),
}

/// Failures of an individual import request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to parse `{file_name}`: {reason}")]
    Parse { file_name: String, reason: String },
}

/// Outcome of an asynchronous import request.
///
/// `seq` is the sequence number the request was issued with; the viewer
/// uses it to recognize completions that a later request has superseded.
#[derive(Debug)]
pub struct ImportCompletion<M> {
    pub seq: u64,
    pub meshes: Result<Vec<M>, ImportError>,
}

/// Render backend the viewer drives.
///
/// `import_mesh` must return immediately; its result surfaces later through
/// `poll_import`, on the backend's own schedule. Everything else is
/// synchronous.
pub trait Engine {
    type Scene;
    type Camera;
    type MeshHandle;
    type LoopHandle;

    /// Realize an orbit camera in the backend and attach it for user input
    fn create_camera(
        &mut self,
        scene: &mut Self::Scene,
        camera: &OrbitCamera,
    ) -> Result<Self::Camera, ViewerError>;

    /// Realize a hemispheric light in the backend
    fn create_light(
        &mut self,
        scene: &mut Self::Scene,
        light: &HemisphericLight,
    ) -> Result<(), ViewerError>;

    /// Request an asynchronous import of `file_name` resolved against `url`.
    /// An empty `name_filter` imports every mesh found in the asset.
    fn import_mesh(
        &mut self,
        name_filter: &str,
        url: &str,
        file_name: &str,
        scene: &mut Self::Scene,
        seq: u64,
    );

    /// Free the backend resources behind a mesh handle
    fn dispose_mesh(&mut self, scene: &mut Self::Scene, mesh: Self::MeshHandle);

    /// Begin invoking the frame callback once per display refresh
    fn start_render_loop(&mut self) -> Self::LoopHandle;

    /// Stop the render loop started at mount
    fn stop_render_loop(&mut self, handle: Self::LoopHandle);

    /// Deliver the next pending import completion, if any
    fn poll_import(&mut self, scene: &mut Self::Scene)
        -> Option<ImportCompletion<Self::MeshHandle>>;
}
