/// Scene state for the terminal backend
use stlview_core::{HemisphericLight, TriangleMesh};

/// Opaque handle to a mesh instance resident in a [`TermScene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

/// A named mesh resident in the scene
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub id: MeshId,
    pub name: String,
    pub mesh: TriangleMesh,
}

/// The terminal engine's scene: an id-allocating mesh table plus the light.
#[derive(Debug)]
pub struct TermScene {
    next_id: u64,
    meshes: Vec<MeshInstance>,
    pub light: HemisphericLight,
    disposed: u64,
}

impl TermScene {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            meshes: Vec::new(),
            light: HemisphericLight::default(),
            disposed: 0,
        }
    }

    pub fn insert(&mut self, name: &str, mesh: TriangleMesh) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.meshes.push(MeshInstance {
            id,
            name: name.to_string(),
            mesh,
        });
        id
    }

    /// Release a mesh instance. Disposing an id that is not resident
    /// (including a second dispose of the same id) is a no-op.
    pub fn dispose(&mut self, id: MeshId) {
        let before = self.meshes.len();
        self.meshes.retain(|m| m.id != id);
        if self.meshes.len() < before {
            self.disposed += 1;
        }
    }

    pub fn meshes(&self) -> &[MeshInstance] {
        &self.meshes
    }

    pub fn resident_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }
}

impl Default for TermScene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_allocates_distinct_ids() {
        let mut scene = TermScene::new();
        let a = scene.insert("a.stl", TriangleMesh::cube(1.0));
        let b = scene.insert("b.stl", TriangleMesh::cube(1.0));
        assert_ne!(a, b);
        assert_eq!(scene.resident_count(), 2);
    }

    #[test]
    fn dispose_removes_exactly_one_instance() {
        let mut scene = TermScene::new();
        let a = scene.insert("a.stl", TriangleMesh::cube(1.0));
        let b = scene.insert("b.stl", TriangleMesh::cube(1.0));

        scene.dispose(a);
        assert_eq!(scene.resident_count(), 1);
        assert_eq!(scene.disposed_count(), 1);
        assert_eq!(scene.meshes()[0].id, b);
    }

    #[test]
    fn double_dispose_is_a_no_op() {
        let mut scene = TermScene::new();
        let a = scene.insert("a.stl", TriangleMesh::cube(1.0));
        scene.dispose(a);
        scene.dispose(a);
        assert_eq!(scene.resident_count(), 0);
        assert_eq!(scene.disposed_count(), 1);
    }
}
