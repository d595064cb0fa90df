pub mod glb_writer;

pub use glb_writer::{PlacedMesh, write_glb, write_glb_file};
