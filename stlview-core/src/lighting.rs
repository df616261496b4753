/// Hemispheric (ambient sky) lighting
use nalgebra::Vector3;

/// A light that blends between sky and ground around a direction.
///
/// Surfaces facing the direction receive full intensity, surfaces facing
/// away receive none, with a smooth hemisphere falloff in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphericLight {
    pub direction: Vector3<f32>,
    pub intensity: f32,
}

impl HemisphericLight {
    pub fn new(direction: Vector3<f32>, intensity: f32) -> Self {
        Self {
            direction: direction.normalize(),
            intensity,
        }
    }

    /// Brightness in [0, 1] for a surface normal
    pub fn shade(&self, normal: &Vector3<f32>) -> f32 {
        let facing = normal.normalize().dot(&self.direction);
        ((facing * 0.5 + 0.5) * self.intensity).clamp(0.0, 1.0)
    }
}

impl Default for HemisphericLight {
    fn default() -> Self {
        Self::new(Vector3::y(), 1.0)
    }
}
