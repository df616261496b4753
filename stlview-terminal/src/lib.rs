/// Terminal backend for stlview
///
/// Implements the viewer's [`Engine`] contract on top of an ASCII
/// rasterizer: meshes live in a [`TermScene`], imports are fetched on
/// background threads, and [`TerminalApp`] drives the frame loop, keyboard
/// orbit control and status line.
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use nalgebra::Matrix4;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

use stlview_core::{OrbitCamera, RotationState, Transform};
use stlview_viewer::{
    Engine, ImportCompletion, Viewer, ViewerError, ViewerInputs, ViewerPhase, ViewportSize,
};

pub mod importer;
pub mod renderer;
pub mod scene;

pub use renderer::AsciiRenderer;
pub use scene::{MeshId, TermScene};

use importer::UrlImporter;

const MODEL_FIT_SIZE: f32 = 1.5;
const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 0.2;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

/// Token handed out by `start_render_loop`; returning it stops the loop.
pub struct RenderLoop(());

/// The render backend: owns the importer and the loop flag. Scene data is
/// owned by the viewer and passed back in through the trait methods.
pub struct TerminalEngine {
    importer: UrlImporter,
    loop_running: bool,
}

impl TerminalEngine {
    pub fn new() -> Self {
        Self {
            importer: UrlImporter::new(),
            loop_running: false,
        }
    }

    pub fn loop_running(&self) -> bool {
        self.loop_running
    }
}

impl Default for TerminalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TerminalEngine {
    type Scene = TermScene;
    type Camera = OrbitCamera;
    type MeshHandle = MeshId;
    type LoopHandle = RenderLoop;

    fn create_camera(
        &mut self,
        _scene: &mut TermScene,
        camera: &OrbitCamera,
    ) -> Result<OrbitCamera, ViewerError> {
        // The terminal camera is the orbit model itself; input control is
        // attached by the app mapping key events onto it.
        Ok(camera.clone())
    }

    fn create_light(
        &mut self,
        scene: &mut TermScene,
        light: &stlview_core::HemisphericLight,
    ) -> Result<(), ViewerError> {
        scene.light = *light;
        Ok(())
    }

    fn import_mesh(
        &mut self,
        _name_filter: &str,
        url: &str,
        file_name: &str,
        _scene: &mut TermScene,
        seq: u64,
    ) {
        // An STL asset holds a single mesh, so the name filter never
        // narrows anything here.
        self.importer.request(url, file_name, seq);
    }

    fn dispose_mesh(&mut self, scene: &mut TermScene, mesh: MeshId) {
        scene.dispose(mesh);
    }

    fn start_render_loop(&mut self) -> RenderLoop {
        self.loop_running = true;
        RenderLoop(())
    }

    fn stop_render_loop(&mut self, _handle: RenderLoop) {
        self.loop_running = false;
    }

    fn poll_import(&mut self, scene: &mut TermScene) -> Option<ImportCompletion<MeshId>> {
        let fetched = self.importer.poll()?;
        Some(ImportCompletion {
            seq: fetched.seq,
            meshes: fetched
                .result
                .map(|mesh| vec![scene.insert(&fetched.file_name, mesh)]),
        })
    }
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    engine: TerminalEngine,
    viewer: Viewer<TerminalEngine>,
    renderer: AsciiRenderer,
    rotation: RotationState,
    playlist: Vec<String>,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(inputs: ViewerInputs) -> Result<Self, AppError> {
        let (width, height) = terminal::size()?;
        let mut engine = TerminalEngine::new();
        let viewer = Viewer::mount(&mut engine, TermScene::new(), inputs)?;

        Ok(Self {
            engine,
            viewer,
            renderer: AsciiRenderer::new(
                width as usize,
                height as usize,
                ViewportSize::default().aspect(),
            ),
            rotation: RotationState::new(0.3, 0.3, 0.0),
            playlist: Vec::new(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    /// Swap the viewed file; a value-equal pair is a no-op.
    pub fn set_inputs(&mut self, inputs: ViewerInputs) {
        self.viewer.update(&mut self.engine, inputs);
    }

    /// Extra files at the same base URL, cycled with the Tab key
    pub fn set_playlist(&mut self, files: Vec<String>) {
        self.playlist = files;
    }

    fn cycle_playlist(&mut self) {
        let current = self.viewer.inputs().clone();
        if let Some(file) = next_file(&self.playlist, &current.mesh_file_name) {
            self.set_inputs(ViewerInputs::new(current.mesh_url, file));
        }
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    /// Tear the viewer down: stops the render loop, releases the meshes.
    pub fn shutdown(self) {
        let mut engine = self.engine;
        self.viewer.unmount(&mut engine);
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            if event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }

            // Apply finished imports
            self.viewer.pump(&mut self.engine);

            // Update
            self.update();

            // Render, while the loop handle from mount is live
            if self.engine.loop_running() {
                self.render()?;
            }

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> Result<(), AppError> {
        if let Event::Key(KeyEvent { code, .. }) = event::read()? {
            let camera = self.viewer.camera_mut();
            match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char('a') | KeyCode::Left => camera.orbit(-ORBIT_STEP, 0.0),
                KeyCode::Char('d') | KeyCode::Right => camera.orbit(ORBIT_STEP, 0.0),
                KeyCode::Char('w') | KeyCode::Up => camera.orbit(0.0, -ORBIT_STEP),
                KeyCode::Char('s') | KeyCode::Down => camera.orbit(0.0, ORBIT_STEP),
                KeyCode::Char('+') | KeyCode::Char('=') => camera.zoom(-ZOOM_STEP),
                KeyCode::Char('-') => camera.zoom(ZOOM_STEP),
                KeyCode::Tab => self.cycle_playlist(),
                _ => {}
            }
        }
        Ok(())
    }

    fn update(&mut self) {
        // Continuous slow rotation for demo effect
        self.rotation.rotate(0.01, 0.015, 0.0);
    }

    /// Model matrix framing the resident mesh inside the orbit radius
    fn model_matrix(&self) -> Matrix4<f32> {
        let fit = self
            .viewer
            .scene()
            .meshes()
            .first()
            .and_then(|instance| instance.mesh.bounding_box())
            .map(|bounds| Transform::fit_matrix(&bounds, MODEL_FIT_SIZE))
            .unwrap_or_else(Matrix4::identity);
        Transform::rotation_matrix(&self.rotation) * fit
    }

    fn status_line(&self) -> String {
        let inputs = self.viewer.inputs();
        let state = match self.viewer.phase() {
            ViewerPhase::MeshLoading => format!("loading {}", inputs.mesh_file_name),
            ViewerPhase::MeshLoaded => {
                let triangles: usize = self
                    .viewer
                    .scene()
                    .meshes()
                    .iter()
                    .map(|m| m.mesh.triangles.len())
                    .sum();
                format!("{} | {} triangles", inputs.mesh_file_name, triangles)
            }
            ViewerPhase::NoMesh => match self.viewer.last_error() {
                Some(err) => format!("error: {err}"),
                None => "no mesh".to_string(),
            },
        };
        let cycle_hint = if self.playlist.len() > 1 {
            " Tab=Next"
        } else {
            ""
        };
        format!(
            "stlview | {} | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom{} Q=Quit",
            state, self.fps, cycle_hint
        )
    }

    fn render(&mut self) -> Result<(), AppError> {
        let model = self.model_matrix();

        self.renderer.clear();
        self.renderer
            .render_scene(self.viewer.scene(), &model, self.viewer.camera());

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Status overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(self.status_line()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// The playlist entry after `current`, wrapping at the end. Falls back to
/// the first entry when `current` is not in the list; None when cycling
/// would land on the file already shown.
fn next_file(files: &[String], current: &str) -> Option<String> {
    let next = match files.iter().position(|f| f == current) {
        Some(at) => &files[(at + 1) % files.len()],
        None => files.first()?,
    };
    if next == current {
        None
    } else {
        Some(next.clone())
    }
}
