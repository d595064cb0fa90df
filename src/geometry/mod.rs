pub mod assembler;
pub mod involute;
pub mod sector;
pub mod template;

pub use assembler::{GearMeshAssembler, build_gear, build_gear_with};
pub use involute::InvoluteSolver;
pub use sector::{HubFace, SectorLayout, SectorMesher, Slot};
pub use template::{FilletBlend, ToothTemplateBuilder};
