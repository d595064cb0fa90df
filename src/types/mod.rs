pub mod mesh;
pub mod profile;

pub use mesh::{GearMesh, Vertex};
pub use profile::{ProfilePoint, SectorTemplate};
