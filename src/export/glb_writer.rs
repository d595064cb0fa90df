use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gltf::binary::Glb;
use gltf_json::Index;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type as AccessorType};
use gltf_json::buffer::Target;
use gltf_json::mesh::{Mode, Primitive, Semantic};
use gltf_json::validation::{Checked, USize64};
use tracing::info;

use crate::config::MaterialStyle;
use crate::error::{GearError, Result};
use crate::types::GearMesh;

const MESHOPT_EXTENSION: &str = "EXT_meshopt_compression";

/// One gear to export, with its node translation.
#[derive(Debug, Clone)]
pub struct PlacedMesh<'a> {
    pub name: String,
    pub mesh: &'a GearMesh,
    pub translation: [f32; 3],
}

/// Serialize gears into a binary GLB (glTF 2.0) byte buffer.
///
/// Produces:
/// - 1 buffer holding every attribute and index view
/// - 2 materials shared by all gears: cut surfaces, then blank
/// - per gear: 1 Mesh with 2 Primitives (cut, blank) over shared position
///   and normal accessors, and 1 Node carrying the translation
///
/// Indices use u16 when a gear has at most 65535 vertices. With `compress`,
/// attribute and index views are encoded with EXT_meshopt_compression.
pub fn write_glb(meshes: &[PlacedMesh<'_>], style: &MaterialStyle, compress: bool) -> Result<Vec<u8>> {
    let mut root = gltf_json::Root {
        asset: gltf_json::Asset {
            version: "2.0".into(),
            generator: Some("gear-mesh".into()),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut bin_data: Vec<u8> = Vec::new();
    let buffer_idx = Index::new(0); // pushed at the end

    let cut_material = push_material(&mut root, "cut", style.cut_color, style);
    let blank_material = push_material(&mut root, "blank", style.blank_color, style);

    let mut nodes = Vec::with_capacity(meshes.len());
    for placed in meshes {
        let mesh = placed.mesh;
        if mesh.is_empty() {
            continue;
        }
        let vertex_count = mesh.vertex_count();

        // --- Positions ---
        let positions = mesh.positions();
        let (pos_min, pos_max) = compute_position_bounds(&positions);
        let pos_view = write_vertex_attribute_view(
            &mut root,
            &mut bin_data,
            buffer_idx,
            &positions,
            vertex_count,
            compress,
        );
        let pos_accessor = push_accessor(
            &mut root,
            pos_view,
            vertex_count,
            ComponentType::F32,
            AccessorType::Vec3,
            Some((pos_min, pos_max)),
        );

        // --- Normals ---
        let normals = mesh.normals();
        let normal_view = write_vertex_attribute_view(
            &mut root,
            &mut bin_data,
            buffer_idx,
            &normals,
            vertex_count,
            compress,
        );
        let normal_accessor = push_accessor(
            &mut root,
            normal_view,
            vertex_count,
            ComponentType::F32,
            AccessorType::Vec3,
            None,
        );

        let mut attributes = BTreeMap::new();
        attributes.insert(Checked::Valid(Semantic::Positions), pos_accessor);
        attributes.insert(Checked::Valid(Semantic::Normals), normal_accessor);

        // --- One primitive per surface group ---
        let use_u16_indices = vertex_count <= 65535;
        let idx_component_type = if use_u16_indices {
            ComponentType::U16
        } else {
            ComponentType::U32
        };

        let mut primitives = Vec::with_capacity(2);
        for (indices, material) in [
            (mesh.cut_indices(), cut_material),
            (mesh.blank_indices(), blank_material),
        ] {
            let idx_view = write_index_view(
                &mut root,
                &mut bin_data,
                buffer_idx,
                indices,
                vertex_count,
                use_u16_indices,
                compress,
            );
            let idx_accessor = push_accessor(
                &mut root,
                idx_view,
                indices.len(),
                idx_component_type,
                AccessorType::Scalar,
                None,
            );

            primitives.push(Primitive {
                attributes: attributes.clone(),
                indices: Some(idx_accessor),
                material: Some(material),
                mode: Checked::Valid(Mode::Triangles),
                targets: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        let mesh_idx = root.push(gltf_json::Mesh {
            primitives,
            weights: None,
            name: Some(placed.name.clone()),
            extensions: Default::default(),
            extras: Default::default(),
        });

        nodes.push(root.push(gltf_json::Node {
            mesh: Some(mesh_idx),
            name: Some(placed.name.clone()),
            translation: Some(placed.translation),
            ..Default::default()
        }));
    }

    let scene_idx = root.push(gltf_json::Scene {
        nodes,
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });
    root.scene = Some(scene_idx);

    if compress && !bin_data.is_empty() {
        root.extensions_used.push(MESHOPT_EXTENSION.to_string());
        root.extensions_required.push(MESHOPT_EXTENSION.to_string());
    }

    // --- Buffer (the one buffer holding all data) ---
    pad_to_four(&mut bin_data, 0);
    let bin = if bin_data.is_empty() {
        None
    } else {
        root.push(gltf_json::Buffer {
            byte_length: USize64::from(bin_data.len()),
            uri: None,
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        Some(bin_data)
    };

    // --- Assemble GLB ---
    let json_string = gltf_json::serialize::to_string(&root)
        .map_err(|e| GearError::Output(format!("glTF JSON serialization failed: {e}")))?;
    let mut json_bytes = json_string.into_bytes();
    // JSON chunk is padded with spaces
    pad_to_four(&mut json_bytes, b' ');

    let bin_chunk = bin.as_ref().map_or(0, |b| 8 + b.len());
    let glb = Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: (12 + 8 + json_bytes.len() + bin_chunk) as u32,
        },
        json: Cow::Owned(json_bytes),
        bin: bin.map(Cow::Owned),
    };

    glb.to_vec()
        .map_err(|e| GearError::Output(format!("GLB serialization failed: {e}")))
}

/// Write the GLB to `path`, returning the number of bytes written.
pub fn write_glb_file(
    path: &Path,
    meshes: &[PlacedMesh<'_>],
    style: &MaterialStyle,
    compress: bool,
) -> Result<usize> {
    let bytes = write_glb(meshes, style, compress)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)
        .map_err(|e| GearError::Output(format!("Failed to write {}: {e}", path.display())))?;
    info!(path = %path.display(), bytes = bytes.len(), compress, "Wrote GLB");
    Ok(bytes.len())
}

fn pad_to_four(data: &mut Vec<u8>, fill: u8) {
    while data.len() % 4 != 0 {
        data.push(fill);
    }
}

fn push_accessor(
    root: &mut gltf_json::Root,
    view: Index<gltf_json::buffer::View>,
    count: usize,
    component_type: ComponentType,
    type_: AccessorType,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> Index<gltf_json::Accessor> {
    root.push(gltf_json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(count),
        component_type: Checked::Valid(GenericComponentType(component_type)),
        type_: Checked::Valid(type_),
        min: bounds.map(|(min, _)| serde_json::json!(min)),
        max: bounds.map(|(_, max)| serde_json::json!(max)),
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// EXT_meshopt_compression metadata for an encoded view.
fn meshopt_extension(
    byte_offset: usize,
    byte_length: usize,
    stride: usize,
    count: usize,
    mode: &str,
) -> gltf_json::extensions::buffer::View {
    let mut ext_map = serde_json::Map::new();
    ext_map.insert(
        MESHOPT_EXTENSION.into(),
        serde_json::json!({
            "buffer": 0,
            "byteOffset": byte_offset,
            "byteLength": byte_length,
            "byteStride": stride,
            "count": count,
            "mode": mode
        }),
    );
    gltf_json::extensions::buffer::View { others: ext_map }
}

/// Write a vec3 f32 attribute view, meshopt-encoded when `compress` is set
/// and the encoder succeeds.
fn write_vertex_attribute_view(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    data: &[f32],
    vertex_count: usize,
    compress: bool,
) -> Index<gltf_json::buffer::View> {
    const STRIDE: usize = 12;
    pad_to_four(bin_data, 0);
    let byte_offset = bin_data.len();

    let encoded = if compress {
        let vertices: &[[f32; 3]] = bytemuck::cast_slice(data);
        meshopt::encode_vertex_buffer(vertices).ok()
    } else {
        None
    };

    if let Some(encoded) = encoded {
        bin_data.extend_from_slice(&encoded);
        root.push(gltf_json::buffer::View {
            buffer: buffer_idx,
            byte_length: USize64::from(encoded.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None, // no stride on compressed views
            name: None,
            target: None,
            extensions: Some(meshopt_extension(
                byte_offset,
                encoded.len(),
                STRIDE,
                vertex_count,
                "ATTRIBUTES",
            )),
            extras: Default::default(),
        })
    } else {
        let raw: &[u8] = bytemuck::cast_slice(data);
        bin_data.extend_from_slice(raw);
        root.push(gltf_json::buffer::View {
            buffer: buffer_idx,
            byte_length: USize64::from(raw.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            name: None,
            target: Some(Checked::Valid(Target::ArrayBuffer)),
            extensions: Default::default(),
            extras: Default::default(),
        })
    }
}

/// Write an index view, meshopt-encoded when `compress` is set and the
/// encoder succeeds.
fn write_index_view(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    indices: &[u32],
    vertex_count: usize,
    use_u16: bool,
    compress: bool,
) -> Index<gltf_json::buffer::View> {
    pad_to_four(bin_data, 0);
    let byte_offset = bin_data.len();

    let encoded = if compress {
        meshopt::encode_index_buffer(indices, vertex_count).ok()
    } else {
        None
    };

    if let Some(encoded) = encoded {
        let stride = if use_u16 { 2 } else { 4 };
        bin_data.extend_from_slice(&encoded);
        root.push(gltf_json::buffer::View {
            buffer: buffer_idx,
            byte_length: USize64::from(encoded.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            name: None,
            target: None,
            extensions: Some(meshopt_extension(
                byte_offset,
                encoded.len(),
                stride,
                indices.len(),
                "TRIANGLES",
            )),
            extras: Default::default(),
        })
    } else {
        let byte_length = if use_u16 {
            let idx_u16: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            bin_data.extend_from_slice(bytemuck::cast_slice(&idx_u16));
            indices.len() * 2
        } else {
            bin_data.extend_from_slice(bytemuck::cast_slice(indices));
            indices.len() * 4
        };

        root.push(gltf_json::buffer::View {
            buffer: buffer_idx,
            byte_length: USize64::from(byte_length),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            name: None,
            target: Some(Checked::Valid(Target::ElementArrayBuffer)),
            extensions: Default::default(),
            extras: Default::default(),
        })
    }
}

fn push_material(
    root: &mut gltf_json::Root,
    name: &str,
    color: [f32; 4],
    style: &MaterialStyle,
) -> Index<gltf_json::Material> {
    let pbr = gltf_json::material::PbrMetallicRoughness {
        base_color_factor: gltf_json::material::PbrBaseColorFactor(color),
        metallic_factor: gltf_json::material::StrengthFactor(style.metallic),
        roughness_factor: gltf_json::material::StrengthFactor(style.roughness),
        base_color_texture: None,
        metallic_roughness_texture: None,
        extensions: Default::default(),
        extras: Default::default(),
    };

    root.push(gltf_json::Material {
        pbr_metallic_roughness: pbr,
        alpha_mode: Checked::Valid(gltf_json::material::AlphaMode::Opaque),
        alpha_cutoff: None,
        double_sided: false,
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: gltf_json::material::EmissiveFactor([0.0, 0.0, 0.0]),
        name: Some(name.to_string()),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Compute min/max for a flat positions array (stride 3).
fn compute_position_bounds(positions: &[f32]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for chunk in positions.chunks_exact(3) {
        for i in 0..3 {
            min[i] = min[i].min(chunk[i]);
            max[i] = max[i].max(chunk[i]);
        }
    }

    (min, max)
}
