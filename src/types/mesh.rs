use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One mesh vertex: position followed by unit normal, six packed floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Triangle mesh of one gear.
///
/// The index buffer holds two surface groups back to back: the cut tooth
/// surfaces (`..cut_index_count`) and the gear blank (`cut_index_count..`).
#[derive(Debug, Clone, Default)]
pub struct GearMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Partition point between the cut and blank index groups.
    pub cut_index_count: usize,
}

impl GearMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat vertex buffer, `[px, py, pz, nx, ny, nz, ...]`.
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Flank, fillet and root floor triangles.
    pub fn cut_indices(&self) -> &[u32] {
        &self.indices[..self.cut_index_count]
    }

    /// Side face, outer rim and hub triangles.
    pub fn blank_indices(&self) -> &[u32] {
        &self.indices[self.cut_index_count..]
    }

    /// Interleaved positions only, for writers that keep attributes apart.
    pub fn positions(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.position).collect()
    }

    /// Interleaved normals only.
    pub fn normals(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.normal).collect()
    }

    /// Rotate positions and normals about the gear axis by the given angle
    /// in degrees (f64 math, write back f32).
    ///
    /// Normals turn with the positions. A position-only rotation, which is
    /// all a placement transform strictly needs, would leave every normal
    /// pointing at the unrotated surface.
    pub fn rotate_z(&mut self, degrees: f64) {
        let radians = degrees.to_radians();
        let cos_a = radians.cos();
        let sin_a = radians.sin();

        let rotate = |v: &mut [f32; 3]| {
            let x = v[0] as f64;
            let y = v[1] as f64;
            v[0] = (x * cos_a - y * sin_a) as f32;
            v[1] = (x * sin_a + y * cos_a) as f32;
        };

        for vertex in self.vertices.iter_mut() {
            rotate(&mut vertex.position);
            rotate(&mut vertex.normal);
        }
    }

    /// Axis-aligned bounds `(min, max)` of all vertex positions.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), v| (lo.min(v.position()), hi.max(v.position())),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
