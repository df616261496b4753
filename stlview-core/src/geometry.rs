/// Geometry primitives for mesh rendering
use nalgebra::{Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order of the vertices
    pub fn face_normal(&self) -> Vector3<f32> {
        let [a, b, c] = [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ];
        (b - a).cross(&(c - a)).normalize()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the longest side
    pub fn max_extent(&self) -> f32 {
        let d = self.max - self.min;
        d.x.max(d.y).max(d.z)
    }

    fn grow(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }
}

/// A triangle soup as produced by the STL parser
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub triangles: Vec<Triangle>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box over all vertices, or None for an empty mesh
    pub fn bounding_box(&self) -> Option<Aabb> {
        let first = self.triangles.first()?.vertices[0].position;
        let mut bounds = Aabb {
            min: first,
            max: first,
        };
        for triangle in &self.triangles {
            for vertex in &triangle.vertices {
                bounds.grow(&vertex.position);
            }
        }
        Some(bounds)
    }

    /// Axis-aligned unit-style cube, used by demos and tests
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let mut mesh = Self::with_capacity(12);

        // One quad per face, split into two triangles
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            // front (+z)
            (
                [0.0, 0.0, 1.0],
                [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
            ),
            // back (-z)
            (
                [0.0, 0.0, -1.0],
                [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
            ),
            // top (+y)
            (
                [0.0, 1.0, 0.0],
                [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
            ),
            // bottom (-y)
            (
                [0.0, -1.0, 0.0],
                [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
            ),
            // right (+x)
            (
                [1.0, 0.0, 0.0],
                [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
            ),
            // left (-x)
            (
                [-1.0, 0.0, 0.0],
                [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
            ),
        ];

        for ([nx, ny, nz], quad) in faces {
            let v: Vec<Vertex> = quad
                .iter()
                .map(|[x, y, z]| Vertex::new(*x, *y, *z, nx, ny, nz))
                .collect();
            mesh.push(Triangle::new(v[0], v[1], v[2]));
            mesh.push(Triangle::new(v[0], v[2], v[3]));
        }

        mesh
    }
}
