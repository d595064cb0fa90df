pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod pipeline;
pub mod scene;
pub mod types;

pub use config::{GearConfig, GearParameters, NewtonConfig, ToothProfile};
pub use error::{GearError, Result};
pub use geometry::{GearMeshAssembler, build_gear, build_gear_with};
pub use pipeline::Pipeline;
pub use scene::GearPair;
pub use types::GearMesh;
