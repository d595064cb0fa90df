use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use crate::config::GearParameters;
use crate::types::{ProfilePoint, SectorTemplate, Vertex};

/// Which of the two hub centre vertices a slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubFace {
    Front,
    Back,
}

/// A triangle corner, relative to the sector being meshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Vertex of this sector's block.
    Own(usize),
    /// Vertex of the following sector's block; the last sector wraps to the first.
    Next(usize),
    Hub(HubFace),
}

pub type TriangleTemplate = [Slot; 3];

// Corner order within every group of four vertices.
pub const LEAD_FRONT: usize = 0;
pub const TRAIL_FRONT: usize = 1;
pub const LEAD_BACK: usize = 2;
pub const TRAIL_BACK: usize = 3;

/// Maps (sector, local slot) to a global vertex index.
///
/// The buffer starts with the front and back hub centres, followed by one
/// block of `8 (1 + samples)` vertices per sector:
///
/// | local | contents |
/// |---|---|
/// | `0..4` | tip corners, radial normals |
/// | `4..8` | root corners, radial normals |
/// | `8 + 4i + k` | flank sample `i`, profile normal |
/// | `8 + 4 samples + 4i + k` | side-face sample `i`, normal ±z |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLayout {
    sectors: usize,
    samples: usize,
}

impl SectorLayout {
    pub const CENTER_COUNT: usize = 2;

    pub fn new(sectors: usize, samples: usize) -> Self {
        Self { sectors, samples }
    }

    pub fn from_params(params: &GearParameters) -> Self {
        Self::new(params.teeth as usize, params.curve_samples)
    }

    pub fn sectors(&self) -> usize {
        self.sectors
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn vertices_per_sector(&self) -> usize {
        8 * (1 + self.samples)
    }

    pub fn vertex_count(&self) -> usize {
        Self::CENTER_COUNT + self.sectors * self.vertices_per_sector()
    }

    pub fn rim(corner: usize) -> usize {
        corner
    }

    pub fn root(corner: usize) -> usize {
        4 + corner
    }

    pub fn flank(sample: usize, corner: usize) -> usize {
        8 + 4 * sample + corner
    }

    pub fn face(&self, sample: usize, corner: usize) -> usize {
        8 + 4 * self.samples + 4 * sample + corner
    }

    /// Global vertex index of `slot` in sector `sector`. Sector slots wrap
    /// modulo the sector blocks; the hub centres sit outside that range.
    pub fn resolve(&self, sector: usize, slot: Slot) -> u32 {
        let stride = self.vertices_per_sector();
        let ring = self.sectors * stride;
        let index = match slot {
            Slot::Own(local) => Self::CENTER_COUNT + (sector * stride + local) % ring,
            Slot::Next(local) => Self::CENTER_COUNT + (sector * stride + stride + local) % ring,
            Slot::Hub(HubFace::Front) => 0,
            Slot::Hub(HubFace::Back) => 1,
        };
        index as u32
    }
}

/// Turns the tooth template into per-sector vertex blocks and triangles.
pub struct SectorMesher<'a> {
    template: &'a SectorTemplate,
    layout: SectorLayout,
}

impl<'a> SectorMesher<'a> {
    pub fn new(template: &'a SectorTemplate, layout: SectorLayout) -> Self {
        Self { template, layout }
    }

    pub fn layout(&self) -> SectorLayout {
        self.layout
    }

    /// The two hub centre vertices, front first.
    pub fn center_vertices(&self) -> [Vertex; 2] {
        [
            Vertex::new(self.template.front_center(), Vec3::Z),
            Vertex::new(self.template.back_center(), Vec3::NEG_Z),
        ]
    }

    /// Append the vertex block of `sector`, the template turned by
    /// `2 pi sector / sectors`.
    pub fn append_vertices(&self, sector: usize, out: &mut Vec<Vertex>) {
        let rotation = Vec2::from_angle(TAU * sector as f32 / self.layout.sectors() as f32);
        let turn = |p: &ProfilePoint| p.rotated(rotation);
        let t = self.template.half_thickness;

        let lead: Vec<ProfilePoint> = self.template.leading.iter().map(turn).collect();
        let trail: Vec<ProfilePoint> = self.template.trailing.iter().map(turn).collect();
        let corners = |i: usize| [(lead[i], t), (trail[i], t), (lead[i], -t), (trail[i], -t)];

        let radial = |p: &ProfilePoint| p.position.normalize_or_zero().extend(0.0);
        let tip = self.layout.samples() - 1;

        out.reserve(self.layout.vertices_per_sector());
        for (p, z) in corners(tip) {
            out.push(Vertex::new(p.at_z(z), radial(&p)));
        }
        for (p, z) in corners(0) {
            out.push(Vertex::new(p.at_z(z), radial(&p)));
        }
        for i in 0..self.layout.samples() {
            for (p, z) in corners(i) {
                out.push(Vertex::new(p.at_z(z), p.normal.extend(0.0)));
            }
        }
        for i in 0..self.layout.samples() {
            for (p, z) in corners(i) {
                out.push(Vertex::new(p.at_z(z), Vec3::Z * z.signum()));
            }
        }
    }

    /// Flank strips of both flanks plus the root floor towards the next
    /// sector: `12 samples - 6` indices.
    pub fn cut_triangles(&self) -> Vec<TriangleTemplate> {
        use Slot::{Next, Own};
        let flank = SectorLayout::flank;
        let root = SectorLayout::root;

        let mut tris = Vec::with_capacity(4 * self.layout.samples() - 2);
        for i in 0..self.layout.samples() - 1 {
            tris.push([
                Own(flank(i, LEAD_FRONT)),
                Own(flank(i, LEAD_BACK)),
                Own(flank(i + 1, LEAD_FRONT)),
            ]);
            tris.push([
                Own(flank(i + 1, LEAD_FRONT)),
                Own(flank(i, LEAD_BACK)),
                Own(flank(i + 1, LEAD_BACK)),
            ]);
            tris.push([
                Own(flank(i, TRAIL_FRONT)),
                Own(flank(i + 1, TRAIL_FRONT)),
                Own(flank(i, TRAIL_BACK)),
            ]);
            tris.push([
                Own(flank(i + 1, TRAIL_FRONT)),
                Own(flank(i + 1, TRAIL_BACK)),
                Own(flank(i, TRAIL_BACK)),
            ]);
        }

        tris.push([
            Own(root(TRAIL_FRONT)),
            Own(root(TRAIL_BACK)),
            Next(root(LEAD_FRONT)),
        ]);
        tris.push([
            Next(root(LEAD_FRONT)),
            Own(root(TRAIL_BACK)),
            Next(root(LEAD_BACK)),
        ]);
        tris
    }

    /// Side faces, outer rim and hub spokes: `12 samples + 6` indices.
    pub fn blank_triangles(&self) -> Vec<TriangleTemplate> {
        use Slot::{Hub, Next, Own};
        let face = |i, k| self.layout.face(i, k);
        let rim = SectorLayout::rim;

        let mut tris = Vec::with_capacity(4 * self.layout.samples() + 2);
        for i in 0..self.layout.samples() - 1 {
            tris.push([
                Own(face(i, LEAD_FRONT)),
                Own(face(i + 1, LEAD_FRONT)),
                Own(face(i + 1, TRAIL_FRONT)),
            ]);
            tris.push([
                Own(face(i, LEAD_FRONT)),
                Own(face(i + 1, TRAIL_FRONT)),
                Own(face(i, TRAIL_FRONT)),
            ]);
            tris.push([
                Own(face(i, LEAD_BACK)),
                Own(face(i + 1, TRAIL_BACK)),
                Own(face(i + 1, LEAD_BACK)),
            ]);
            tris.push([
                Own(face(i, LEAD_BACK)),
                Own(face(i, TRAIL_BACK)),
                Own(face(i + 1, TRAIL_BACK)),
            ]);
        }

        tris.push([Own(rim(LEAD_FRONT)), Own(rim(LEAD_BACK)), Own(rim(TRAIL_FRONT))]);
        tris.push([Own(rim(TRAIL_FRONT)), Own(rim(LEAD_BACK)), Own(rim(TRAIL_BACK))]);

        // Spokes under the tooth and across the gap to the next tooth.
        tris.push([
            Hub(HubFace::Front),
            Own(face(0, LEAD_FRONT)),
            Own(face(0, TRAIL_FRONT)),
        ]);
        tris.push([
            Hub(HubFace::Front),
            Own(face(0, TRAIL_FRONT)),
            Next(face(0, LEAD_FRONT)),
        ]);
        tris.push([
            Hub(HubFace::Back),
            Own(face(0, TRAIL_BACK)),
            Own(face(0, LEAD_BACK)),
        ]);
        tris.push([
            Hub(HubFace::Back),
            Next(face(0, LEAD_BACK)),
            Own(face(0, TRAIL_BACK)),
        ]);
        tris
    }

    /// Resolve `triangles` for `sector` and append the global indices.
    pub fn append_indices(&self, sector: usize, triangles: &[TriangleTemplate], out: &mut Vec<u32>) {
        out.extend(
            triangles
                .iter()
                .flatten()
                .map(|&slot| self.layout.resolve(sector, slot)),
        );
    }
}
