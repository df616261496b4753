/// The single-file mesh viewer lifecycle
use nalgebra::{Point3, Vector3};
use stlview_core::{HemisphericLight, OrbitCamera};

use crate::engine::{Engine, ImportCompletion, ImportError, ViewerError};

// Initial orbit per the classic arc-rotate setup: azimuth 1.5 rad, polar
// 1 rad, radius 2, constructed against an off-origin anchor and then
// re-aimed at the scene origin.
const INITIAL_ALPHA: f32 = 1.5;
const INITIAL_BETA: f32 = 1.0;
const INITIAL_RADIUS: f32 = 2.0;
const INITIAL_ANCHOR: [f32; 3] = [0.0, 5.0, -10.0];

const LIGHT_INTENSITY: f32 = 0.7;

/// The externally supplied inputs: where to fetch the mesh from.
///
/// Compared by value; a change in either field replaces the loaded mesh set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerInputs {
    pub mesh_url: String,
    pub mesh_file_name: String,
}

impl ViewerInputs {
    pub fn new(mesh_url: impl Into<String>, mesh_file_name: impl Into<String>) -> Self {
        Self {
            mesh_url: mesh_url.into(),
            mesh_file_name: mesh_file_name.into(),
        }
    }
}

/// Where the viewer is in its mesh lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    NoMesh,
    MeshLoading,
    MeshLoaded,
}

/// A mounted viewer instance.
///
/// Owns the scene, the camera handle and the resident mesh set. All
/// mutation goes through `update` and `pump`, which take the engine by
/// exclusive reference, so no other code path can observe the state
/// mid-transition.
pub struct Viewer<E: Engine> {
    scene: E::Scene,
    camera: E::Camera,
    loaded_meshes: Option<Vec<E::MeshHandle>>,
    inputs: ViewerInputs,
    issued_seq: u64,
    awaiting: bool,
    loop_handle: Option<E::LoopHandle>,
    last_error: Option<ImportError>,
}

impl<E: Engine> Viewer<E> {
    /// Mount the viewer: camera, light, initial import, render loop.
    ///
    /// Camera or light construction failures abort the mount.
    pub fn mount(
        engine: &mut E,
        mut scene: E::Scene,
        inputs: ViewerInputs,
    ) -> Result<Self, ViewerError> {
        let anchor = Point3::from(INITIAL_ANCHOR);
        let mut orbit = OrbitCamera::new(INITIAL_ALPHA, INITIAL_BETA, INITIAL_RADIUS, anchor);
        orbit.set_target(Point3::origin());
        orbit.allow_panning = false;
        let camera = engine.create_camera(&mut scene, &orbit)?;

        engine.create_light(&mut scene, &HemisphericLight::new(Vector3::y(), LIGHT_INTENSITY))?;

        let mut viewer = Self {
            scene,
            camera,
            loaded_meshes: None,
            inputs,
            issued_seq: 0,
            awaiting: false,
            loop_handle: None,
            last_error: None,
        };
        viewer.request_import(engine);
        viewer.loop_handle = Some(engine.start_render_loop());
        Ok(viewer)
    }

    fn request_import(&mut self, engine: &mut E) {
        self.issued_seq += 1;
        self.awaiting = true;
        log::info!(
            "importing `{}` from `{}` (request {})",
            self.inputs.mesh_file_name,
            self.inputs.mesh_url,
            self.issued_seq
        );
        // Empty name filter: take every mesh the asset contains.
        engine.import_mesh(
            "",
            &self.inputs.mesh_url,
            &self.inputs.mesh_file_name,
            &mut self.scene,
            self.issued_seq,
        );
    }

    /// React to new inputs. A value-equal pair is a no-op; otherwise the
    /// resident mesh set is disposed before the replacement import is
    /// issued, so at most one set is ever resident.
    pub fn update(&mut self, engine: &mut E, next: ViewerInputs) {
        if next == self.inputs {
            return;
        }
        self.dispose_loaded(engine);
        self.inputs = next;
        self.request_import(engine);
    }

    /// Drain pending import completions from the engine.
    ///
    /// A completion whose sequence number is not the most recently issued
    /// one was superseded while in flight; its meshes are disposed on
    /// arrival and the result is discarded.
    pub fn pump(&mut self, engine: &mut E) {
        while let Some(completion) = engine.poll_import(&mut self.scene) {
            self.apply_completion(engine, completion);
        }
    }

    fn apply_completion(&mut self, engine: &mut E, completion: ImportCompletion<E::MeshHandle>) {
        if completion.seq != self.issued_seq {
            log::warn!(
                "discarding stale import completion {} (current request is {})",
                completion.seq,
                self.issued_seq
            );
            if let Ok(meshes) = completion.meshes {
                for mesh in meshes {
                    engine.dispose_mesh(&mut self.scene, mesh);
                }
            }
            return;
        }

        self.awaiting = false;
        match completion.meshes {
            Ok(meshes) => {
                log::info!(
                    "imported `{}` from `{}`: {} mesh(es)",
                    self.inputs.mesh_file_name,
                    self.inputs.mesh_url,
                    meshes.len()
                );
                self.last_error = None;
                self.loaded_meshes = Some(meshes);
            }
            Err(err) => {
                log::error!("import request {} failed: {}", completion.seq, err);
                self.last_error = Some(err);
            }
        }
    }

    /// Tear down: stop the render loop and release the resident mesh set.
    pub fn unmount(mut self, engine: &mut E) {
        if let Some(handle) = self.loop_handle.take() {
            engine.stop_render_loop(handle);
        }
        self.dispose_loaded(engine);
    }

    fn dispose_loaded(&mut self, engine: &mut E) {
        if let Some(meshes) = self.loaded_meshes.take() {
            for mesh in meshes {
                engine.dispose_mesh(&mut self.scene, mesh);
            }
        }
    }

    pub fn phase(&self) -> ViewerPhase {
        if self.loaded_meshes.is_some() {
            ViewerPhase::MeshLoaded
        } else if self.awaiting {
            ViewerPhase::MeshLoading
        } else {
            ViewerPhase::NoMesh
        }
    }

    pub fn inputs(&self) -> &ViewerInputs {
        &self.inputs
    }

    pub fn scene(&self) -> &E::Scene {
        &self.scene
    }

    pub fn camera(&self) -> &E::Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut E::Camera {
        &mut self.camera
    }

    pub fn loaded_meshes(&self) -> Option<&[E::MeshHandle]> {
        self.loaded_meshes.as_deref()
    }

    /// The failure of the most recent import request, if it failed
    pub fn last_error(&self) -> Option<&ImportError> {
        self.last_error.as_ref()
    }

    /// True while the render loop handle from mount is still held
    pub fn loop_running(&self) -> bool {
        self.loop_handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, PartialEq)]
    enum Event {
        CameraCreated { alpha: f32, beta: f32, radius: f32, target: Point3<f32> },
        LightCreated { intensity: f32 },
        ImportRequested { filter: String, url: String, file: String, seq: u64 },
        Disposed(u32),
        LoopStarted,
        LoopStopped,
    }

    #[derive(Default)]
    struct MockScene;

    /// Records every call and replays completions queued by the test
    #[derive(Default)]
    struct MockEngine {
        events: Vec<Event>,
        completions: VecDeque<ImportCompletion<u32>>,
        fail_camera: bool,
    }

    impl MockEngine {
        fn complete(&mut self, seq: u64, meshes: Result<Vec<u32>, ImportError>) {
            self.completions.push_back(ImportCompletion { seq, meshes });
        }

        fn import_requests(&self) -> Vec<&Event> {
            self.events
                .iter()
                .filter(|e| matches!(e, Event::ImportRequested { .. }))
                .collect()
        }

        fn disposed(&self) -> Vec<u32> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Disposed(id) => Some(*id),
                    _ => None,
                })
                .collect()
        }
    }

    impl Engine for MockEngine {
        type Scene = MockScene;
        type Camera = OrbitCamera;
        type MeshHandle = u32;
        type LoopHandle = ();

        fn create_camera(
            &mut self,
            _scene: &mut MockScene,
            camera: &OrbitCamera,
        ) -> Result<OrbitCamera, ViewerError> {
            if self.fail_camera {
                return Err(ViewerError::Camera("out of device handles".to_string()));
            }
            self.events.push(Event::CameraCreated {
                alpha: camera.alpha,
                beta: camera.beta,
                radius: camera.radius,
                target: camera.target,
            });
            Ok(camera.clone())
        }

        fn create_light(
            &mut self,
            _scene: &mut MockScene,
            light: &stlview_core::HemisphericLight,
        ) -> Result<(), ViewerError> {
            self.events.push(Event::LightCreated {
                intensity: light.intensity,
            });
            Ok(())
        }

        fn import_mesh(
            &mut self,
            name_filter: &str,
            url: &str,
            file_name: &str,
            _scene: &mut MockScene,
            seq: u64,
        ) {
            self.events.push(Event::ImportRequested {
                filter: name_filter.to_string(),
                url: url.to_string(),
                file: file_name.to_string(),
                seq,
            });
        }

        fn dispose_mesh(&mut self, _scene: &mut MockScene, mesh: u32) {
            self.events.push(Event::Disposed(mesh));
        }

        fn start_render_loop(&mut self) {
            self.events.push(Event::LoopStarted);
        }

        fn stop_render_loop(&mut self, _handle: ()) {
            self.events.push(Event::LoopStopped);
        }

        fn poll_import(&mut self, _scene: &mut MockScene) -> Option<ImportCompletion<u32>> {
            self.completions.pop_front()
        }
    }

    fn mounted(engine: &mut MockEngine) -> Viewer<MockEngine> {
        Viewer::mount(
            engine,
            MockScene,
            ViewerInputs::new("https://host/models/", "part.stl"),
        )
        .unwrap()
    }

    #[test]
    fn mount_sets_up_camera_light_import_and_loop() {
        let mut engine = MockEngine::default();
        let viewer = mounted(&mut engine);

        assert_eq!(
            engine.events[0],
            Event::CameraCreated {
                alpha: 1.5,
                beta: 1.0,
                radius: 2.0,
                // anchored at (0, 5, -10), then re-aimed at the origin
                target: Point3::origin(),
            }
        );
        assert_eq!(engine.events[1], Event::LightCreated { intensity: 0.7 });
        assert_eq!(
            engine.events[2],
            Event::ImportRequested {
                filter: String::new(),
                url: "https://host/models/".to_string(),
                file: "part.stl".to_string(),
                seq: 1,
            }
        );
        assert_eq!(engine.events[3], Event::LoopStarted);
        assert_eq!(viewer.phase(), ViewerPhase::MeshLoading);
        assert!(viewer.loop_running());
    }

    #[test]
    fn camera_failure_is_fatal_to_mount() {
        let mut engine = MockEngine {
            fail_camera: true,
            ..MockEngine::default()
        };

        let result = Viewer::mount(
            &mut engine,
            MockScene,
            ViewerInputs::new("https://host/models/", "part.stl"),
        );

        assert!(matches!(result, Err(ViewerError::Camera(_))));
        // Nothing downstream of the failed construction may have happened
        assert!(engine.import_requests().is_empty());
        assert!(!engine.events.contains(&Event::LoopStarted));
    }

    #[test]
    fn completion_moves_viewer_to_loaded() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);

        engine.complete(1, Ok(vec![10, 11]));
        viewer.pump(&mut engine);

        assert_eq!(viewer.phase(), ViewerPhase::MeshLoaded);
        assert_eq!(viewer.loaded_meshes(), Some(&[10, 11][..]));
    }

    #[test]
    fn identical_inputs_are_a_no_op() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);
        engine.complete(1, Ok(vec![10]));
        viewer.pump(&mut engine);

        viewer.update(
            &mut engine,
            ViewerInputs::new("https://host/models/", "part.stl"),
        );

        assert_eq!(engine.import_requests().len(), 1);
        assert!(engine.disposed().is_empty());
        assert_eq!(viewer.phase(), ViewerPhase::MeshLoaded);
    }

    #[test]
    fn changed_file_name_disposes_all_before_reimport() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);
        engine.complete(1, Ok(vec![10, 11]));
        viewer.pump(&mut engine);

        viewer.update(
            &mut engine,
            ViewerInputs::new("https://host/models/", "other.stl"),
        );

        assert_eq!(engine.disposed(), vec![10, 11]);
        let requests = engine.import_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            *requests[1],
            Event::ImportRequested {
                filter: String::new(),
                url: "https://host/models/".to_string(),
                file: "other.stl".to_string(),
                seq: 2,
            }
        );
        // Disposal happens strictly before the new request goes out
        let dispose_at = engine
            .events
            .iter()
            .position(|e| *e == Event::Disposed(10))
            .unwrap();
        let import_at = engine
            .events
            .iter()
            .position(|e| matches!(e, Event::ImportRequested { seq: 2, .. }))
            .unwrap();
        assert!(dispose_at < import_at);
        assert_eq!(viewer.phase(), ViewerPhase::MeshLoading);
    }

    #[test]
    fn repeated_changes_keep_one_mesh_set_resident() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);

        let n = 5u32;
        for i in 1..=n {
            if i > 1 {
                viewer.update(
                    &mut engine,
                    ViewerInputs::new("https://host/models/", format!("part{i}.stl")),
                );
            }
            engine.complete(i as u64, Ok(vec![i * 100, i * 100 + 1]));
            viewer.pump(&mut engine);
        }

        // N imports completed, N-1 mesh sets (two handles each) disposed
        assert_eq!(engine.import_requests().len(), n as usize);
        assert_eq!(engine.disposed().len(), (n as usize - 1) * 2);
        assert_eq!(viewer.loaded_meshes(), Some(&[500, 501][..]));
    }

    #[test]
    fn stale_completion_is_discarded_and_its_meshes_disposed() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);

        // Second request goes out before the first completes
        viewer.update(
            &mut engine,
            ViewerInputs::new("https://host/models/", "other.stl"),
        );

        // The second's result arrives first, then the stale first's
        engine.complete(2, Ok(vec![20]));
        engine.complete(1, Ok(vec![10]));
        viewer.pump(&mut engine);

        assert_eq!(viewer.loaded_meshes(), Some(&[20][..]));
        assert_eq!(engine.disposed(), vec![10]);
        assert_eq!(viewer.phase(), ViewerPhase::MeshLoaded);
    }

    #[test]
    fn failed_import_surfaces_the_error() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);

        engine.complete(
            1,
            Err(ImportError::Fetch {
                url: "https://host/models/part.stl".to_string(),
                reason: "404".to_string(),
            }),
        );
        viewer.pump(&mut engine);

        assert_eq!(viewer.phase(), ViewerPhase::NoMesh);
        assert!(matches!(
            viewer.last_error(),
            Some(ImportError::Fetch { .. })
        ));

        // A later success clears the error
        viewer.update(
            &mut engine,
            ViewerInputs::new("https://host/models/", "other.stl"),
        );
        engine.complete(2, Ok(vec![30]));
        viewer.pump(&mut engine);
        assert!(viewer.last_error().is_none());
        assert_eq!(viewer.phase(), ViewerPhase::MeshLoaded);
    }

    #[test]
    fn unmount_stops_the_loop_and_disposes() {
        let mut engine = MockEngine::default();
        let mut viewer = mounted(&mut engine);
        engine.complete(1, Ok(vec![10]));
        viewer.pump(&mut engine);

        viewer.unmount(&mut engine);

        assert!(engine.events.contains(&Event::LoopStopped));
        assert_eq!(engine.disposed(), vec![10]);
    }
}
