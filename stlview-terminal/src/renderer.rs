/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Matrix4;
use std::io::Write;
use stlview_core::{OrbitCamera, Triangle};

use crate::scene::TermScene;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Rasterizes the scene's meshes into a character grid.
///
/// The projection uses the logical viewport aspect rather than the grid's
/// column/row ratio, so the image stays proportioned on tall terminal cells.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    aspect: f32,
    depth_buffer: Vec<f32>,
    shade_buffer: Vec<f32>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize, aspect: f32) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            aspect,
            depth_buffer: vec![f32::INFINITY; size],
            shade_buffer: vec![0.0; size],
        }
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.shade_buffer.fill(0.0);
    }

    /// Rasterize every resident mesh under the scene's light
    pub fn render_scene(
        &mut self,
        scene: &TermScene,
        model_matrix: &Matrix4<f32>,
        camera: &OrbitCamera,
    ) {
        for instance in scene.meshes() {
            for triangle in &instance.mesh.triangles {
                self.render_triangle(scene, triangle, model_matrix, camera);
            }
        }
    }

    fn render_triangle(
        &mut self,
        scene: &TermScene,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        camera: &OrbitCamera,
    ) {
        // Project vertices to screen space; skip clipped triangles
        let mut screen_coords = [(0.0f32, 0.0f32, 0.0f32); 3];
        for (coord, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(
                &vertex.position,
                model_matrix,
                self.aspect,
                self.width as u32,
                self.height as u32,
            ) {
                Some(projected) => *coord = projected,
                None => return,
            }
        }

        // Rotate the normal with the model so shading follows the mesh
        let normal = model_matrix
            .transform_vector(&triangle.face_normal())
            .normalize();
        let shade = scene.light.shade(&normal);

        self.rasterize_triangle(&screen_coords, shade);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], shade: f32) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box clipped to the grid
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.shade_buffer[idx] = shade;
                        }
                    }
                }
            }
        }
    }

    /// True when at least one cell was shaded this frame
    pub fn has_output(&self) -> bool {
        self.shade_buffer.iter().any(|s| *s > 0.0)
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let shade = self.shade_buffer[y * self.width + x];
                let ramp_index = ((shade * (LUMINOSITY_RAMP.len() - 1) as f32) as usize)
                    .min(LUMINOSITY_RAMP.len() - 1);

                let color = match ramp_index {
                    0..=2 => Color::DarkGrey,
                    3..=4 => Color::Grey,
                    5..=6 => Color::White,
                    _ => Color::Cyan,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(LUMINOSITY_RAMP[ramp_index]))?;
            }
            writer.queue(Print('\n'))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Barycentric coordinates of a point in a screen-space triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use stlview_core::TriangleMesh;

    #[test]
    fn barycentric_center_weights_are_equal() {
        let (w0, w1, w2) =
            barycentric((0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (1.0, 1.0)).unwrap();
        assert!((w0 - w1).abs() < 1e-6);
        assert!((w1 - w2).abs() < 1e-6);
    }

    #[test]
    fn degenerate_triangle_has_no_coordinates() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }

    #[test]
    fn cube_in_front_of_camera_shades_some_cells() {
        let mut scene = TermScene::new();
        scene.insert("cube.stl", TriangleMesh::cube(1.0));

        let mut camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::origin());
        camera.set_target(Point3::origin());

        let mut renderer = AsciiRenderer::new(80, 40, 2.0);
        renderer.clear();
        renderer.render_scene(&scene, &Matrix4::identity(), &camera);

        assert!(renderer.has_output());
    }

    #[test]
    fn clear_resets_the_buffers() {
        let mut scene = TermScene::new();
        scene.insert("cube.stl", TriangleMesh::cube(1.0));
        let camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::origin());

        let mut renderer = AsciiRenderer::new(40, 20, 2.0);
        renderer.render_scene(&scene, &Matrix4::identity(), &camera);
        renderer.clear();

        assert!(!renderer.has_output());
    }
}
