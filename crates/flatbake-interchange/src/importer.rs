//! glTF 2.0 scene import.
//!
//! Materials are rebuilt as node graphs in the shape a DCC importer produces,
//! including the packed metallic-roughness texture split through a
//! separate-color node. That packing is exactly what naive format conversion
//! loses, and what the channel bake recovers.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use flatbake_scene::graph::{socket, MathOp, MixBlend, NodeKind, SocketValue};
use flatbake_scene::{
    ColorSpace, GraphError, Image, ImageId, ImportError, Material, MaterialGraph, MaterialId,
    MeshObject, NodeId, Scene, SceneImporter, UvLayer,
};

type Mat4 = [[f32; 4]; 4];

const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Column-major product `a * b`.
fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, cell) in column.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][r] * b[c][k]).sum();
        }
    }
    out
}

fn transform_point(m: &Mat4, p: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (r, v) in out.iter_mut().enumerate() {
        *v = m[0][r] * p[0] + m[1][r] * p[1] + m[2][r] * p[2] + m[3][r];
    }
    out
}

/// glTF importer backed by the `gltf` crate.
#[derive(Debug, Clone, Default)]
pub struct GltfImporter;

impl GltfImporter {
    pub fn new() -> Self {
        Self
    }
}

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<Scene, ImportError> {
        let (document, buffers, images) =
            gltf::import(path).map_err(|e| ImportError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut state = ImportState {
            path,
            buffers: &buffers,
            images: &images,
            scene: Scene::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            names: HashSet::new(),
        };

        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(root) => {
                for node in root.nodes() {
                    state.visit(&node, &IDENTITY)?;
                }
            }
            None => warn!(path = %path.display(), "File defines no scene"),
        }

        info!(
            path = %path.display(),
            objects = state.scene.objects.len(),
            materials = state.scene.materials.len(),
            "Imported glTF"
        );
        Ok(state.scene)
    }
}

struct ImportState<'a> {
    path: &'a Path,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    scene: Scene,
    /// glTF material index -> scene material.
    materials: HashMap<usize, MaterialId>,
    /// (glTF image index, decode space) -> scene image.
    textures: HashMap<(usize, ColorSpace), ImageId>,
    /// Object names already in the scene.
    names: HashSet<String>,
}

impl ImportState<'_> {
    fn unsupported(&self, message: impl Into<String>) -> ImportError {
        ImportError::Unsupported {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn graph_error(&self, error: GraphError) -> ImportError {
        self.unsupported(format!("could not rebuild material graph: {error}"))
    }

    fn visit(&mut self, node: &gltf::Node<'_>, parent: &Mat4) -> Result<(), ImportError> {
        let world = mul(parent, &node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let base_name = node
                .name()
                .or_else(|| mesh.name())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Mesh.{:03}", node.index()));
            let primitive_count = mesh.primitives().len();

            for (i, primitive) in mesh.primitives().enumerate() {
                let name = if primitive_count > 1 {
                    format!("{base_name}.{i}")
                } else {
                    base_name.clone()
                };
                let name = unique_name(&self.names, &name);
                if let Some(object) = self.primitive(&name, &primitive, &world)? {
                    self.names.insert(name);
                    self.scene.objects.push(object);
                }
            }
        }

        for child in node.children() {
            self.visit(&child, &world)?;
        }
        Ok(())
    }

    fn primitive(
        &mut self,
        name: &str,
        primitive: &gltf::Primitive<'_>,
        world: &Mat4,
    ) -> Result<Option<MeshObject>, ImportError> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!(object = name, mode = ?primitive.mode(), "Skipping non-triangle primitive");
            return Ok(None);
        }

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let Some(positions) = reader.read_positions() else {
            warn!(object = name, "Skipping primitive without positions");
            return Ok(None);
        };
        let positions: Vec<[f32; 3]> = positions.map(|p| transform_point(world, p)).collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if let Some(bad) = indices.iter().find(|i| **i as usize >= positions.len()) {
            return Err(self.unsupported(format!(
                "primitive '{name}' references vertex {bad} of {}",
                positions.len()
            )));
        }
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let mut object = MeshObject::new(name, positions, triangles);

        if let Some(tex_coords) = reader.read_tex_coords(0) {
            let uvs: Vec<[f32; 2]> = tex_coords.into_f32().collect();
            let corners = object
                .triangles
                .iter()
                .map(|tri| {
                    let corner = |v: u32| {
                        uvs.get(v as usize)
                            .map(|[u, v]| [*u, 1.0 - *v])
                            .unwrap_or([0.0, 0.0])
                    };
                    [corner(tri[0]), corner(tri[1]), corner(tri[2])]
                })
                .collect();
            object.uv = Some(UvLayer::new("UVMap", corners));
        }

        let material = primitive.material();
        let slot = match material.index() {
            Some(index) => Some(self.material(index, &material)?),
            None => None,
        };
        object.material_slots.push(slot);

        debug!(
            object = name,
            triangles = object.triangles.len(),
            uv = object.has_uv(),
            "Imported primitive"
        );
        Ok(Some(object))
    }

    fn material(
        &mut self,
        index: usize,
        material: &gltf::Material<'_>,
    ) -> Result<MaterialId, ImportError> {
        if let Some(id) = self.materials.get(&index) {
            return Ok(*id);
        }
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Material.{index:03}"));
        let graph = self.build_graph(material)?;
        let id = self.scene.add_material(Material::with_graph(name, graph));
        self.materials.insert(index, id);
        Ok(id)
    }

    fn build_graph(&mut self, material: &gltf::Material<'_>) -> Result<MaterialGraph, ImportError> {
        let mut graph = MaterialGraph::new();
        self.wire(&mut graph, material)
            .map_err(|e| self.graph_error(e))?;
        Ok(graph)
    }

    fn wire(
        &mut self,
        graph: &mut MaterialGraph,
        material: &gltf::Material<'_>,
    ) -> Result<(), GraphError> {
        let hub = graph.add_node(NodeKind::PrincipledBsdf);
        let output = graph.add_node(NodeKind::MaterialOutput);
        graph.connect(hub, socket::BSDF, output, socket::SURFACE)?;

        let pbr = material.pbr_metallic_roughness();

        let base_factor = pbr.base_color_factor();
        let base_texture = pbr
            .base_color_texture()
            .and_then(|info| self.texture(&info.texture(), ColorSpace::Srgb));
        match base_texture {
            Some(image) => {
                let tex = graph.add_node(NodeKind::ImageTexture { image: Some(image) });
                if base_factor[..3] == [1.0, 1.0, 1.0] {
                    graph.connect(tex, socket::COLOR, hub, socket::BASE_COLOR)?;
                } else {
                    let mix = graph.add_node(NodeKind::MixColor {
                        blend: MixBlend::Multiply,
                    });
                    graph.set_input_value(mix, socket::FACTOR, SocketValue::Float(1.0))?;
                    graph.set_input_value(mix, socket::B, SocketValue::Color(base_factor))?;
                    graph.connect(tex, socket::COLOR, mix, socket::A)?;
                    graph.connect(mix, socket::RESULT, hub, socket::BASE_COLOR)?;
                }
            }
            None => {
                graph.set_input_value(hub, socket::BASE_COLOR, SocketValue::Color(base_factor))?;
            }
        }
        graph.set_input_value(hub, socket::ALPHA, SocketValue::Float(base_factor[3]))?;

        let metallic = pbr.metallic_factor();
        let roughness = pbr.roughness_factor();
        let packed = pbr
            .metallic_roughness_texture()
            .and_then(|info| self.texture(&info.texture(), ColorSpace::NonColor));
        match packed {
            Some(image) => {
                let tex = graph.add_node(NodeKind::ImageTexture { image: Some(image) });
                let separate = graph.add_node(NodeKind::SeparateColor);
                graph.connect(tex, socket::COLOR, separate, socket::COLOR)?;
                for (channel, factor, input) in [
                    (socket::GREEN, roughness, socket::ROUGHNESS),
                    (socket::BLUE, metallic, socket::METALLIC),
                ] {
                    connect_scaled(graph, separate, channel, factor, hub, input)?;
                }
            }
            None => {
                graph.set_input_value(hub, socket::METALLIC, SocketValue::Float(metallic))?;
                graph.set_input_value(hub, socket::ROUGHNESS, SocketValue::Float(roughness))?;
            }
        }

        let [er, eg, eb] = material.emissive_factor();
        let emissive_texture = material
            .emissive_texture()
            .and_then(|info| self.texture(&info.texture(), ColorSpace::Srgb));
        if let Some(image) = emissive_texture {
            let tex = graph.add_node(NodeKind::ImageTexture { image: Some(image) });
            graph.connect(tex, socket::COLOR, hub, socket::EMISSION_COLOR)?;
            graph.set_input_value(hub, socket::EMISSION_STRENGTH, SocketValue::Float(1.0))?;
        } else if er > 0.0 || eg > 0.0 || eb > 0.0 {
            graph.set_input_value(
                hub,
                socket::EMISSION_COLOR,
                SocketValue::Color([er, eg, eb, 1.0]),
            )?;
            graph.set_input_value(hub, socket::EMISSION_STRENGTH, SocketValue::Float(1.0))?;
        }

        Ok(())
    }

    /// Decodes a glTF image into the scene, once per color space.
    fn texture(&mut self, texture: &gltf::Texture<'_>, space: ColorSpace) -> Option<ImageId> {
        let source = texture.source();
        let index = source.index();
        if let Some(id) = self.textures.get(&(index, space)) {
            return Some(*id);
        }
        let data = self.images.get(index)?;
        let name = source
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Image.{index:03}"));
        let Some(pixels) = decode_pixels(data, space) else {
            warn!(image = %name, format = ?data.format, "Unsupported image format; texture ignored");
            return None;
        };
        let image = Image::from_pixels(name, data.width, data.height, space, pixels)?;
        let id = self.scene.images.insert(image);
        self.textures.insert((index, space), id);
        Some(id)
    }
}

/// `base`, or the first free `base.NNN` when another object already has it.
/// Baked images are named after their object, so names must not repeat.
fn unique_name(taken: &HashSet<String>, base: &str) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}.{n:03}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Links `from.socket` into `to.input`, through a multiply node unless the
/// factor is one.
fn connect_scaled(
    graph: &mut MaterialGraph,
    from: NodeId,
    from_socket: &str,
    factor: f32,
    to: NodeId,
    input: &str,
) -> Result<(), GraphError> {
    if factor == 1.0 {
        graph.connect(from, from_socket, to, input)?;
    } else {
        let math = graph.add_node(NodeKind::Math {
            op: MathOp::Multiply,
        });
        graph.set_input_value(math, socket::B, SocketValue::Float(factor))?;
        graph.connect(from, from_socket, math, socket::A)?;
        graph.connect(math, socket::VALUE, to, input)?;
    }
    Ok(())
}

/// Converts decoded image data to linear RGBA floats.
fn decode_pixels(data: &gltf::image::Data, space: ColorSpace) -> Option<Vec<[f32; 4]>> {
    use gltf::image::Format;

    let (channels, bytes_per_channel) = match data.format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        _ => return None,
    };
    let read = |chunk: &[u8], c: usize| -> f32 {
        if bytes_per_channel == 1 {
            chunk[c] as f32 / 255.0
        } else {
            u16::from_le_bytes([chunk[c * 2], chunk[c * 2 + 1]]) as f32 / 65535.0
        }
    };

    let stride = channels * bytes_per_channel;
    let pixels = data
        .pixels
        .chunks_exact(stride)
        .map(|chunk| {
            let r = read(chunk, 0);
            let (g, b) = match channels {
                1 | 2 => (r, r),
                _ => (read(chunk, 1), read(chunk, 2)),
            };
            let a = match channels {
                2 => read(chunk, 1),
                4 => read(chunk, 3),
                _ => 1.0,
            };
            [space.decode(r), space.decode(g), space.decode(b), a]
        })
        .collect();
    Some(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use flatbake_scene::Role;
    use serde_json::json;

    fn data_uri(bytes: &[u8]) -> String {
        format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    /// One quad: positions, optional UVs, u16 indices.
    fn quad_buffer(with_uv: bool) -> (Vec<u8>, serde_json::Value) {
        let mut bytes = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        let uv_offset = bytes.len();
        if with_uv {
            for uv in [[0.0f32, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]] {
                for c in uv {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        let index_offset = bytes.len();
        for i in [0u16, 1, 2, 0, 2, 3] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }

        let mut views = vec![json!({"buffer": 0, "byteOffset": 0, "byteLength": 48})];
        let mut accessors = vec![json!({
            "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        })];
        let mut attributes = json!({"POSITION": 0});
        if with_uv {
            views.push(json!({"buffer": 0, "byteOffset": uv_offset, "byteLength": 32}));
            accessors.push(json!({
                "bufferView": views.len() - 1, "componentType": 5126, "count": 4, "type": "VEC2"
            }));
            attributes["TEXCOORD_0"] = json!(accessors.len() - 1);
        }
        views.push(json!({"buffer": 0, "byteOffset": index_offset, "byteLength": 12}));
        accessors.push(json!({
            "bufferView": views.len() - 1, "componentType": 5123, "count": 6, "type": "SCALAR"
        }));
        let indices = accessors.len() - 1;

        let doc = json!({
            "bufferViews": views,
            "accessors": accessors,
            "attributes": attributes,
            "indices": indices,
        });
        (bytes, doc)
    }

    fn write_gltf(dir: &Path, with_uv: bool, material: Option<serde_json::Value>) -> std::path::PathBuf {
        let (bytes, parts) = quad_buffer(with_uv);
        let mut primitive = json!({
            "attributes": parts["attributes"],
            "indices": parts["indices"],
        });
        let mut doc = json!({
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"name": "Plane", "mesh": 0, "translation": [0.0, 0.0, 2.0]}],
            "buffers": [{"byteLength": bytes.len(), "uri": data_uri(&bytes)}],
            "bufferViews": parts["bufferViews"],
            "accessors": parts["accessors"],
        });
        if let Some(material) = material {
            primitive["material"] = json!(0);
            doc["materials"] = json!([material]);
        }
        doc["meshes"] = json!([{"name": "PlaneMesh", "primitives": [primitive]}]);

        let path = dir.join("scene.gltf");
        std::fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_imports_geometry_with_world_transform() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), true, None);

        let scene = GltfImporter::new().import(&path).unwrap();

        assert_eq!(scene.objects.len(), 1);
        let object = &scene.objects[0];
        assert_eq!(object.name, "Plane");
        assert_eq!(object.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(object.positions[2], [1.0, 1.0, 2.0]);
        // glTF v runs downward; the first corner (0, 1) lands at v = 0.
        let uv = object.uv.as_ref().unwrap();
        assert_eq!(uv.corners[0][0], [0.0, 0.0]);
        assert_eq!(uv.corners[0][2], [1.0, 1.0]);
        assert_eq!(object.material_slots, vec![None]);
    }

    #[test]
    fn test_missing_uvs_leave_layer_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), false, None);
        let scene = GltfImporter::new().import(&path).unwrap();
        assert!(!scene.objects[0].has_uv());
    }

    #[test]
    fn test_static_material_values() {
        let dir = tempfile::tempdir().unwrap();
        let material = json!({
            "name": "Steel",
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.5, 0.5, 0.5, 1.0],
                "metallicFactor": 1.0,
                "roughnessFactor": 0.3
            }
        });
        let path = write_gltf(dir.path(), true, Some(material));

        let scene = GltfImporter::new().import(&path).unwrap();
        let id = scene.objects[0].primary_material().unwrap();
        let material = scene.material(id).unwrap();
        assert_eq!(material.name, "Steel");
        assert!(material.use_nodes);

        let graph = &material.graph;
        let hub = graph.find_role(Role::ShaderHub).unwrap();
        assert_eq!(
            graph.input_value(hub, socket::METALLIC),
            Some(SocketValue::Float(1.0))
        );
        assert_eq!(
            graph.input_value(hub, socket::ROUGHNESS),
            Some(SocketValue::Float(0.3))
        );
        assert!(!graph.is_linked(hub, socket::BASE_COLOR));
    }

    #[test]
    fn test_duplicate_node_names_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gltf(dir.path(), true, None);
        let mut doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        doc["nodes"] = json!([
            {"name": "Part", "mesh": 0},
            {"name": "Part", "mesh": 0},
            {"name": "Part", "mesh": 0}
        ]);
        doc["scenes"] = json!([{"nodes": [0, 1, 2]}]);
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let scene = GltfImporter::new().import(&path).unwrap();

        let names: Vec<_> = scene.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Part", "Part.001", "Part.002"]);
    }

    #[test]
    fn test_unique_name_skips_taken_suffixes() {
        let taken: HashSet<String> = ["Part", "Part.001"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_name(&taken, "Part"), "Part.002");
        assert_eq!(unique_name(&taken, "Bolt"), "Bolt");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = GltfImporter::new()
            .import(Path::new("/nonexistent/scene.gltf"))
            .unwrap_err();
        assert!(matches!(err, ImportError::Read { .. }));
    }

    #[test]
    fn test_matrix_product() {
        let translate = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [1.0, 2.0, 3.0, 1.0],
        ];
        let scale = [
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        // Scale first, then translate.
        let m = mul(&translate, &scale);
        assert_eq!(transform_point(&m, [1.0, 1.0, 1.0]), [3.0, 4.0, 5.0]);
        assert_eq!(mul(&IDENTITY, &m), m);
    }

    #[test]
    fn test_decode_rgba8() {
        let data = gltf::image::Data {
            pixels: vec![255, 0, 0, 128],
            format: gltf::image::Format::R8G8B8A8,
            width: 1,
            height: 1,
        };
        let pixels = decode_pixels(&data, ColorSpace::NonColor).unwrap();
        assert_eq!(pixels[0][0], 1.0);
        assert_eq!(pixels[0][1], 0.0);
        assert!((pixels[0][3] - 128.0 / 255.0).abs() < 1e-6);
    }
}
