use std::time::{Duration, Instant};

use glam::Vec3;
use tracing::info;

use crate::config::{GearConfig, GearParameters};
use crate::error::Result;
use crate::export::glb_writer;
use crate::geometry::{ToothTemplateBuilder, build_gear_with};
use crate::scene::{GearPair, PlacedGear};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub gear_count: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// GLB size, when one was written.
    pub bytes_written: Option<usize>,
    pub duration: Duration,
}

/// Pipeline orchestrator -- build, summarize, export.
pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &GearConfig) -> Result<ProcessingResult> {
        let start = Instant::now();
        let gear = &config.gear;

        info!(
            teeth = gear.teeth,
            mate = ?config.mate_teeth,
            pressure_angle_deg = gear.pressure_angle.to_degrees(),
            profile = %gear.profile,
            "Starting gear build"
        );

        info!("Stage 1/2: Mesh generation");
        let gears = Self::build(config)?;
        let vertex_count: usize = gears.iter().map(|g| g.mesh.vertex_count()).sum();
        let triangle_count: usize = gears.iter().map(|g| g.mesh.triangle_count()).sum();

        print_summary(config, &gears);

        if config.dry_run {
            info!("--dry-run: skipping export");
            return Ok(ProcessingResult {
                gear_count: gears.len(),
                vertex_count,
                triangle_count,
                bytes_written: None,
                duration: start.elapsed(),
            });
        }

        let bytes_written = match &config.output {
            Some(path) => {
                info!("Stage 2/2: Export");
                let placed: Vec<_> = gears.iter().map(PlacedGear::placed).collect();
                Some(glb_writer::write_glb_file(
                    path,
                    &placed,
                    &config.export.style,
                    config.export.compress,
                )?)
            }
            None => {
                info!("No --output given, nothing to export");
                None
            }
        };

        let duration = start.elapsed();
        info!(gears = gears.len(), vertex_count, triangle_count, elapsed = ?duration, "Pipeline complete");

        Ok(ProcessingResult {
            gear_count: gears.len(),
            vertex_count,
            triangle_count,
            bytes_written,
            duration,
        })
    }

    fn build(config: &GearConfig) -> Result<Vec<PlacedGear>> {
        match config.mate_teeth {
            Some(mate) => {
                let pair = GearPair::build(&config.gear, mate)?;
                Ok(vec![pair.driver, pair.driven])
            }
            None => {
                let mesh = build_gear_with(&config.gear)?;
                Ok(vec![PlacedGear {
                    name: format!("gear_{}", config.gear.teeth),
                    teeth: config.gear.teeth,
                    mesh,
                    translation: Vec3::ZERO,
                }])
            }
        }
    }
}

/// Print derived geometry and buffer sizes for each gear.
fn print_summary(config: &GearConfig, gears: &[PlacedGear]) {
    println!("=== Gear Summary ===");
    for gear in gears {
        let params = GearParameters {
            teeth: gear.teeth,
            ..config.gear.clone()
        };
        let flank = if params.uses_pure_involute() {
            "pure involute".to_string()
        } else {
            format!(
                "{} fillet blend",
                ToothTemplateBuilder::new(&params).fillet_blend()
            )
        };
        let mesh = &gear.mesh;

        println!("  {}:", gear.name);
        println!("    Teeth:         {}", params.teeth);
        println!("    Profile:       {} ({flank})", params.profile);
        println!(
            "    Radii:         pitch {:.3}, base {:.3}, tip {:.3}, root {:.3}",
            params.pitch_radius(),
            params.base_radius(),
            params.major_radius(),
            params.minor_radius()
        );
        println!(
            "    Position:      ({:.3}, {:.3}, {:.3})",
            gear.translation.x, gear.translation.y, gear.translation.z
        );
        println!("    Vertices:      {}", mesh.vertex_count());
        println!("    Triangles:     {}", mesh.triangle_count());
        println!(
            "    Indices:       {} ({} cut, {} blank)",
            mesh.index_count(),
            mesh.cut_indices().len(),
            mesh.blank_indices().len()
        );
    }
}
