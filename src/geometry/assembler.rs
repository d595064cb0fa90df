use tracing::debug;

use crate::config::GearParameters;
use crate::error::Result;
use crate::types::GearMesh;

use super::sector::{SectorLayout, SectorMesher};
use super::template::ToothTemplateBuilder;

/// Builds the full gear: one vertex block per tooth, cut indices first.
///
/// No parameter validation happens here; see [`build_gear_with`].
pub struct GearMeshAssembler<'a> {
    params: &'a GearParameters,
}

impl<'a> GearMeshAssembler<'a> {
    pub fn new(params: &'a GearParameters) -> Self {
        Self { params }
    }

    pub fn build(&self) -> Result<GearMesh> {
        let template = ToothTemplateBuilder::new(self.params).build()?;
        let layout = SectorLayout::from_params(self.params);
        let mesher = SectorMesher::new(&template, layout);
        let sectors = layout.sectors();

        let mut vertices = Vec::with_capacity(layout.vertex_count());
        vertices.extend(mesher.center_vertices());
        for sector in 0..sectors {
            mesher.append_vertices(sector, &mut vertices);
        }

        let cut = mesher.cut_triangles();
        let blank = mesher.blank_triangles();
        let mut indices = Vec::with_capacity(3 * sectors * (cut.len() + blank.len()));
        for sector in 0..sectors {
            mesher.append_indices(sector, &cut, &mut indices);
        }
        let cut_index_count = indices.len();
        for sector in 0..sectors {
            mesher.append_indices(sector, &blank, &mut indices);
        }

        debug!(
            teeth = self.params.teeth,
            vertices = vertices.len(),
            indices = indices.len(),
            cut_indices = cut_index_count,
            "Assembled gear mesh"
        );

        Ok(GearMesh {
            vertices,
            indices,
            cut_index_count,
        })
    }
}

/// Validate `params` and build the gear mesh.
pub fn build_gear_with(params: &GearParameters) -> Result<GearMesh> {
    params.validate()?;
    GearMeshAssembler::new(params).build()
}

/// Build a gear with default constants for everything but tooth count,
/// pressure angle (radians) and axial half-thickness.
pub fn build_gear(teeth: u32, pressure_angle: f32, half_thickness: f32) -> Result<GearMesh> {
    build_gear_with(&GearParameters::new(teeth, pressure_angle, half_thickness))
}
