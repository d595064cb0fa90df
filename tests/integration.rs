//! End-to-end integration tests.
//!
//! These build complete gears through the public API, check the buffer
//! properties a renderer relies on, and run the CLI pipeline into a GLB.

use std::collections::HashMap;
use std::fs;

use approx::assert_abs_diff_eq;
use clap::Parser;
use glam::{Vec2, Vec3};

use gear_mesh::config::{CliArgs, GearConfig, NewtonConfig, ToothProfile};
use gear_mesh::{GearMesh, GearPair, GearParameters, Pipeline, build_gear, build_gear_with};

const PRESSURE_ANGLES: [f32; 3] = [14.5, 20.0, 25.0];

fn gear(teeth: u32, degrees: f32) -> GearMesh {
    build_gear(teeth, degrees.to_radians(), 4.0)
        .unwrap_or_else(|e| panic!("{teeth} teeth at {degrees} deg: {e}"))
}

#[test]
fn buffer_sizes_for_common_pressure_angles() {
    for degrees in PRESSURE_ANGLES {
        for teeth in [5, 6, 7, 10, 13, 16, 20, 25, 32, 40, 64, 73, 100] {
            let mesh = gear(teeth, degrees);
            let n = teeth as usize;
            assert_eq!(mesh.vertex_count(), 8 * n * (1 + 16) + 2);
            assert_eq!(mesh.index_count(), 24 * n * 16);
            assert_eq!(mesh.cut_index_count, n * (12 * 16 - 6));
            assert_eq!(mesh.vertex_floats().len(), 6 * mesh.vertex_count());
        }
    }
}

#[test]
fn reference_gear_sizes() {
    let mesh = gear(16, 20.0);
    assert_eq!(mesh.vertex_count(), 2178);
    assert_eq!(mesh.index_count(), 6144);
}

#[test]
fn indices_in_range_and_triangles_distinct() {
    for degrees in PRESSURE_ANGLES {
        for teeth in [5, 16, 41] {
            let mesh = gear(teeth, degrees);
            let count = mesh.vertex_count() as u32;
            assert!(mesh.indices.iter().all(|&i| i < count));
            for tri in mesh.indices.chunks_exact(3) {
                assert!(
                    tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2],
                    "degenerate triangle {tri:?}"
                );
            }
        }
    }
}

#[test]
fn last_sector_wraps_to_first() {
    let mesh = gear(16, 20.0);
    let per_sector = 12 * 16 - 6;
    let last = &mesh.cut_indices()[15 * per_sector..];
    // Root corner of the first sector's leading flank, front face.
    assert!(last.contains(&6));
}

#[test]
fn front_and_back_mirror() {
    let mesh = gear(18, 20.0);
    let v = &mesh.vertices;
    assert_eq!(v[0].position[2], 4.0);
    assert_eq!(v[1].position[2], -4.0);

    for group in v[2..].chunks_exact(4) {
        for (front, back) in [(group[0], group[2]), (group[1], group[3])] {
            assert_eq!(front.position[2], 4.0);
            assert_eq!(back.position[2], -4.0);
            assert_eq!(front.position[..2], back.position[..2]);
        }
    }
}

#[test]
fn rotation_maps_each_sector_onto_the_next() {
    for teeth in [7, 16, 48] {
        let params = GearParameters::new(teeth, 20.0_f32.to_radians(), 4.0);
        let mesh = build_gear_with(&params).unwrap();
        let stride = params.vertices_per_sector();
        let rotation = Vec2::from_angle(std::f32::consts::TAU / teeth as f32);
        let turn = |v: Vec3| rotation.rotate(v.truncate()).extend(v.z);

        // Includes the last sector turning onto sector 0.
        let sectors = teeth as usize;
        for sector in 0..sectors {
            for local in 0..stride {
                let here = mesh.vertices[2 + sector * stride + local];
                let next = mesh.vertices[2 + (sector + 1) % sectors * stride + local];
                let moved = turn(here.position());
                assert!(
                    moved.abs_diff_eq(next.position(), 1e-3),
                    "sector {sector} vertex {local}: {moved} vs {}",
                    next.position()
                );
                assert!(turn(here.normal()).abs_diff_eq(next.normal(), 1e-4));
            }
        }
    }
}

#[test]
fn hub_centres_referenced_twice_per_tooth() {
    for teeth in [5, 16, 37] {
        let mesh = gear(teeth, 20.0);
        let mut uses: HashMap<u32, usize> = HashMap::new();
        for tri in mesh.indices.chunks_exact(3) {
            for &i in tri {
                if i < 2 {
                    *uses.entry(i).or_default() += 1;
                }
            }
        }
        assert_eq!(uses[&0], 2 * teeth as usize);
        assert_eq!(uses[&1], 2 * teeth as usize);
        // Hubs belong to the blank group only.
        assert!(mesh.cut_indices().iter().all(|&i| i >= 2));
    }
}

#[test]
fn minor_radius_of_large_gear() {
    let params = GearParameters::new(80, 20.0_f32.to_radians(), 4.0);
    assert_abs_diff_eq!(params.minor_radius(), 38.843, epsilon = 1e-4);

    let mesh = build_gear_with(&params).unwrap();
    let radii: Vec<f32> = mesh.vertices[2..]
        .iter()
        .map(|v| v.position().truncate().length())
        .collect();
    let min = radii.iter().copied().fold(f32::MAX, f32::min);
    let max = radii.iter().copied().fold(f32::MIN, f32::max);
    assert_abs_diff_eq!(min, 38.843, epsilon = 1e-3);
    assert_abs_diff_eq!(max, 41.0, epsilon = 1e-3);
}

#[test]
fn meshes_around_branch_threshold() {
    for degrees in PRESSURE_ANGLES {
        let critical = GearParameters::new(10, degrees.to_radians(), 4.0)
            .critical_tooth_count()
            .floor() as u32;
        for teeth in [critical, critical + 1] {
            let params = GearParameters::new(teeth, degrees.to_radians(), 4.0);
            let mesh = build_gear_with(&params).unwrap();
            for v in &mesh.vertices[2..] {
                let r = v.position().truncate().length();
                assert!(r.is_finite());
                assert!(r >= params.minor_radius() - 1e-3);
                assert!(r <= params.major_radius() + 1e-3);
            }
        }
    }
}

#[test]
fn normals_are_unit_length() {
    for profile in [ToothProfile::ExactInvolute, ToothProfile::ArcApproximation] {
        let params = GearParameters {
            profile,
            ..GearParameters::new(24, 20.0_f32.to_radians(), 4.0)
        };
        let mesh = build_gear_with(&params).unwrap();
        for v in &mesh.vertices {
            assert_abs_diff_eq!(v.normal().length(), 1.0, epsilon = 1e-4);
        }
    }
}

#[test]
fn triangles_face_outwards() {
    for degrees in PRESSURE_ANGLES {
        for teeth in [8, 20, 90] {
            let mesh = gear(teeth, degrees);
            for tri in mesh.indices.chunks_exact(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
                let face = (b.position() - a.position()).cross(c.position() - a.position());
                let normal = a.normal() + b.normal() + c.normal();
                assert!(face.dot(normal) > 0.0, "{teeth} teeth: {tri:?} winds inwards");
            }
        }
    }
}

#[test]
fn residual_check_accepts_valid_gears() {
    for degrees in PRESSURE_ANGLES {
        let params = GearParameters {
            newton: NewtonConfig {
                iterations: 6,
                residual_tolerance: Some(1e-3),
            },
            ..GearParameters::new(30, degrees.to_radians(), 4.0)
        };
        build_gear_with(&params).unwrap();
    }
}

#[test]
fn rotate_z_preserves_radii() {
    let mut mesh = gear(16, 20.0);
    let before: Vec<f32> = mesh.vertices.iter().map(|v| v.position().length()).collect();
    mesh.rotate_z(37.0);
    for (v, r) in mesh.vertices.iter().zip(before) {
        assert_abs_diff_eq!(v.position().length(), r, epsilon = 1e-4);
        assert_abs_diff_eq!(v.normal().length(), 1.0, epsilon = 1e-4);
    }
}

#[test]
fn gear_pair_combined_buffers() {
    let params = GearParameters::new(16, 20.0_f32.to_radians(), 4.0);
    let pair = GearPair::build(&params, 40).unwrap();
    let combined = pair.combined();

    let na = pair.driver.mesh.vertex_count() as u32;
    let second = &combined.ranges[1];
    assert_eq!(combined.ranges[0].cut.len(), pair.driver.mesh.cut_index_count);
    assert!(combined.indices[second.blank.clone()].contains(&na));
    assert!(combined.indices[second.blank.clone()].contains(&(na + 1)));
}

#[test]
fn pipeline_writes_pair_glb() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("pair.glb");

    let args = CliArgs::parse_from([
        "gear-mesh",
        "-n",
        "20",
        "--mate",
        "30",
        "--pressure-angle",
        "25",
        "-o",
        output.to_str().unwrap(),
    ]);
    let config = GearConfig::from_args(args).unwrap();
    let result = Pipeline::run(&config).unwrap();
    assert_eq!(result.gear_count, 2);

    let bytes = fs::read(&output).unwrap();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    let doc = gltf.document;

    assert_eq!(doc.meshes().count(), 2);
    assert_eq!(doc.materials().count(), 2);
    for mesh in doc.meshes() {
        assert_eq!(mesh.primitives().count(), 2);
    }
    let names: Vec<_> = doc.nodes().filter_map(|n| n.name().map(str::to_string)).collect();
    assert_eq!(names, vec!["gear_20", "gear_30"]);
}

#[test]
fn pipeline_writes_compressed_glb() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("gear.glb");

    let args = CliArgs::parse_from([
        "gear-mesh",
        "-n",
        "24",
        "--compress",
        "-o",
        output.to_str().unwrap(),
    ]);
    let config = GearConfig::from_args(args).unwrap();
    Pipeline::run(&config).unwrap();

    // The gltf validator does not know EXT_meshopt_compression.
    let bytes = fs::read(&output).unwrap();
    let gltf = gltf::Gltf::from_slice_without_validation(&bytes).unwrap();
    assert!(
        gltf.document
            .extensions_required()
            .any(|e| e == "EXT_meshopt_compression")
    );
}

#[test]
fn pipeline_reads_json_parameters() {
    let tmp = tempfile::tempdir().unwrap();
    let params_path = tmp.path().join("gear.json");
    let output = tmp.path().join("gear.glb");
    fs::write(
        &params_path,
        r#"{ "teeth": 12, "half_thickness": 1.0, "profile": "arc_approximation", "curve_samples": 10 }"#,
    )
    .unwrap();

    let args = CliArgs::parse_from([
        "gear-mesh",
        "--config",
        params_path.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    let config = GearConfig::from_args(args).unwrap();
    assert_eq!(config.gear.profile, ToothProfile::ArcApproximation);

    let result = Pipeline::run(&config).unwrap();
    assert_eq!(result.vertex_count, 8 * 12 * 11 + 2);
    assert!(output.exists());
}

#[test]
fn pipeline_missing_config_returns_error() {
    let args = CliArgs::parse_from(["gear-mesh", "--config", "/nonexistent/gear.json"]);
    assert!(GearConfig::from_args(args).is_err());
}

#[test]
fn invalid_parameters_rejected() {
    assert!(build_gear(4, 20.0_f32.to_radians(), 4.0).is_err());
    assert!(build_gear(16, 50.0_f32.to_radians(), 4.0).is_err());
    assert!(build_gear(16, 20.0_f32.to_radians(), 0.0).is_err());
}

#[test]
fn arc_profile_on_small_gear_reports_tip_radius() {
    let params = GearParameters {
        profile: ToothProfile::ArcApproximation,
        ..GearParameters::new(6, 20.0_f32.to_radians(), 4.0)
    };
    let err = build_gear_with(&params).unwrap_err();
    assert!(matches!(err, gear_mesh::GearError::Geometry(_)));
    assert!(err.to_string().contains("tip radius"), "{err}");

    // The exact involute has no reach limit.
    build_gear(6, 20.0_f32.to_radians(), 4.0).unwrap();
}
