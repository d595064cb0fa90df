use std::ops::Range;

use glam::Vec3;
use tracing::info;

use crate::config::GearParameters;
use crate::error::Result;
use crate::export::PlacedMesh;
use crate::geometry::GearMeshAssembler;
use crate::types::{GearMesh, Vertex};

/// A gear mesh with its placement in the scene.
#[derive(Debug, Clone)]
pub struct PlacedGear {
    pub name: String,
    pub teeth: u32,
    pub mesh: GearMesh,
    pub translation: Vec3,
}

impl PlacedGear {
    pub fn placed(&self) -> PlacedMesh<'_> {
        PlacedMesh {
            name: self.name.clone(),
            mesh: &self.mesh,
            translation: self.translation.to_array(),
        }
    }
}

/// Index ranges of one gear inside a [`CombinedMesh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRange {
    pub cut: Range<usize>,
    pub blank: Range<usize>,
}

/// Both gears in one vertex and index buffer, translations applied.
#[derive(Debug, Clone, Default)]
pub struct CombinedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub ranges: Vec<DrawRange>,
}

/// Two meshing gears on the x axis, pitch circles touching at x = (Na - Nb)/2.
#[derive(Debug, Clone)]
pub struct GearPair {
    pub driver: PlacedGear,
    pub driven: PlacedGear,
}

impl GearPair {
    /// Build the driver from `params` and a driven gear with `mate_teeth`
    /// and otherwise identical parameters. The two meshes are built in
    /// parallel.
    pub fn build(params: &GearParameters, mate_teeth: u32) -> Result<Self> {
        let mate = GearParameters {
            teeth: mate_teeth,
            ..params.clone()
        };
        params.validate()?;
        mate.validate()?;

        let (driver, driven) = rayon::join(
            || GearMeshAssembler::new(params).build(),
            || GearMeshAssembler::new(&mate).build(),
        );
        let (mut driver, mut driven) = (driver?, driven?);

        // Turn a tooth of each gear onto the line of centres.
        driver.rotate_z(-90.0);
        driven.rotate_z(90.0);

        let na = params.teeth as f32;
        let nb = mate_teeth as f32;
        info!(
            driver_teeth = params.teeth,
            driven_teeth = mate_teeth,
            center_distance = (na + nb) / 2.0,
            "Built gear pair"
        );

        Ok(Self {
            driver: PlacedGear {
                name: format!("gear_{}", params.teeth),
                teeth: params.teeth,
                mesh: driver,
                translation: Vec3::new(-nb / 2.0, 0.0, 0.0),
            },
            driven: PlacedGear {
                name: format!("gear_{mate_teeth}"),
                teeth: mate_teeth,
                mesh: driven,
                translation: Vec3::new(na / 2.0, 0.0, 0.0),
            },
        })
    }

    pub fn gears(&self) -> [&PlacedGear; 2] {
        [&self.driver, &self.driven]
    }

    pub fn center_distance(&self) -> f32 {
        self.driven.translation.x - self.driver.translation.x
    }

    /// Concatenate both gears; the driven gear's indices are offset by the
    /// driver's vertex count.
    pub fn combined(&self) -> CombinedMesh {
        let mut combined = CombinedMesh::default();
        for gear in self.gears() {
            let base = combined.vertices.len() as u32;
            combined.vertices.extend(gear.mesh.vertices.iter().map(|v| {
                Vertex::new(v.position() + gear.translation, v.normal())
            }));

            let start = combined.indices.len();
            combined
                .indices
                .extend(gear.mesh.indices.iter().map(|&i| i + base));
            let split = start + gear.mesh.cut_index_count;
            combined.ranges.push(DrawRange {
                cut: start..split,
                blank: split..combined.indices.len(),
            });
        }
        combined
    }

    /// Per-gear meshes and translations for the GLB writer.
    pub fn placed(&self) -> Vec<PlacedMesh<'_>> {
        self.gears().into_iter().map(PlacedGear::placed).collect()
    }
}
