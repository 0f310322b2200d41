//! glTF scene fixtures for end-to-end tests.
//!
//! Scenes are written as self-contained `.gltf` files: geometry and images
//! travel as base64 data URIs, so a fixture is a single file in a temp dir.

use std::path::{Path, PathBuf};

use base64::Engine;
use serde_json::{json, Value};

/// Shape of a fixture mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Unit quad in the XY plane, two triangles.
    Quad,
    /// Unit cube, twelve triangles over eight shared vertices.
    Cube,
}

impl Shape {
    fn positions(self) -> Vec<[f32; 3]> {
        match self {
            Shape::Quad => vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            Shape::Cube => vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
        }
    }

    fn indices(self) -> Vec<u16> {
        match self {
            Shape::Quad => vec![0, 1, 2, 0, 2, 3],
            Shape::Cube => vec![
                0, 2, 1, 0, 3, 2, // -z
                4, 5, 6, 4, 6, 7, // +z
                0, 1, 5, 0, 5, 4, // -y
                3, 7, 6, 3, 6, 2, // +y
                0, 4, 7, 0, 7, 3, // -x
                1, 2, 6, 1, 6, 5, // +x
            ],
        }
    }
}

/// Material assigned to a fixture mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialFixture {
    /// Factors only, no textures.
    Static {
        base_color: [f32; 4],
        metallic: f32,
        roughness: f32,
    },
    /// Solid base color texture plus a packed metallic/roughness texture
    /// (roughness in green, metallic in blue), both 4x4.
    Packed { base_color: [u8; 4], packed: [u8; 4] },
}

impl MaterialFixture {
    /// A rough dielectric.
    pub fn plastic() -> Self {
        MaterialFixture::Static {
            base_color: [0.2, 0.4, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.7,
        }
    }

    /// A packed-channel metal: fully metallic, roughness ~0.3.
    pub fn packed_metal() -> Self {
        MaterialFixture::Packed {
            base_color: [200, 120, 40, 255],
            packed: [0, 77, 255, 255],
        }
    }
}

/// One mesh node of a fixture scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFixture {
    pub name: String,
    pub shape: Shape,
    pub with_uv: bool,
    pub material: Option<MaterialFixture>,
}

impl ObjectFixture {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            with_uv: false,
            material: None,
        }
    }

    pub fn with_uv(mut self) -> Self {
        self.with_uv = true;
        self
    }

    pub fn with_material(mut self, material: MaterialFixture) -> Self {
        self.material = Some(material);
        self
    }
}

/// Builder for a glTF fixture scene.
#[derive(Debug, Clone, Default)]
pub struct SceneFixture {
    objects: Vec<ObjectFixture>,
    empties: Vec<String>,
}

impl SceneFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: ObjectFixture) -> Self {
        self.objects.push(object);
        self
    }

    /// Adds a node that carries no mesh.
    pub fn empty_node(mut self, name: impl Into<String>) -> Self {
        self.empties.push(name.into());
        self
    }

    /// Builds the glTF JSON document.
    pub fn to_json(&self) -> Value {
        let mut buffer = Vec::new();
        let mut views = Vec::new();
        let mut accessors = Vec::new();
        let mut meshes = Vec::new();
        let mut nodes = Vec::new();
        let mut materials = Vec::new();
        let mut textures = Vec::new();
        let mut images = Vec::new();

        for (i, object) in self.objects.iter().enumerate() {
            let positions = object.shape.positions();
            let position_accessor = push_view(
                &mut buffer,
                &mut views,
                &mut accessors,
                &f32_bytes(positions.iter().flatten()),
                json!({
                    "componentType": 5126,
                    "count": positions.len(),
                    "type": "VEC3",
                    "min": [0.0, 0.0, 0.0],
                    "max": bounds(&positions),
                }),
            );
            let mut attributes = json!({"POSITION": position_accessor});
            if object.with_uv {
                // Planar projection of XY; the fixture only needs valid coordinates.
                let uvs: Vec<[f32; 2]> = positions.iter().map(|p| [p[0], 1.0 - p[1]]).collect();
                attributes["TEXCOORD_0"] = json!(push_view(
                    &mut buffer,
                    &mut views,
                    &mut accessors,
                    &f32_bytes(uvs.iter().flatten()),
                    json!({"componentType": 5126, "count": uvs.len(), "type": "VEC2"}),
                ));
            }
            let indices = object.shape.indices();
            let index_bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            let index_accessor = push_view(
                &mut buffer,
                &mut views,
                &mut accessors,
                &index_bytes,
                json!({"componentType": 5123, "count": indices.len(), "type": "SCALAR"}),
            );

            let mut primitive = json!({"attributes": attributes, "indices": index_accessor});
            if let Some(material) = &object.material {
                primitive["material"] = json!(materials.len());
                materials.push(material_json(
                    &format!("{}_source", object.name),
                    material,
                    &mut textures,
                    &mut images,
                ));
            }

            meshes.push(json!({"name": format!("{}Mesh", object.name), "primitives": [primitive]}));
            nodes.push(json!({
                "name": object.name,
                "mesh": i,
                "translation": [i as f32 * 2.0, 0.0, 0.0],
            }));
        }

        nodes.extend(self.empties.iter().map(|name| json!({"name": name})));
        let roots: Vec<usize> = (0..nodes.len()).collect();

        let mut doc = json!({
            "asset": {"version": "2.0", "generator": "flatbake-tests"},
            "scene": 0,
            "scenes": [{"nodes": roots}],
            "nodes": nodes,
        });
        if !meshes.is_empty() {
            doc["meshes"] = json!(meshes);
            doc["buffers"] = json!([{"byteLength": buffer.len(), "uri": data_uri("application/octet-stream", &buffer)}]);
            doc["bufferViews"] = json!(views);
            doc["accessors"] = json!(accessors);
        }
        if !materials.is_empty() {
            doc["materials"] = json!(materials);
        }
        if !textures.is_empty() {
            doc["textures"] = json!(textures);
            doc["images"] = json!(images);
        }
        doc
    }

    /// Writes the scene to `dir/name` and returns its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let bytes = serde_json::to_vec_pretty(&self.to_json()).expect("Failed to serialize glTF");
        std::fs::write(&path, bytes).expect("Failed to write glTF fixture");
        path
    }
}

/// The reference scene: a cube without UVs whose metallic and roughness
/// come from a packed texture.
pub fn packed_metal_cube() -> SceneFixture {
    SceneFixture::new()
        .object(ObjectFixture::new("Helmet", Shape::Cube).with_material(MaterialFixture::packed_metal()))
}

/// Encodes a solid RGBA8 PNG.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let data: Vec<u8> = (0..width * height).flat_map(|_| rgba).collect();
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("Failed to write PNG header");
        writer
            .write_image_data(&data)
            .expect("Failed to write PNG data");
    }
    out
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn f32_bytes<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

fn bounds(positions: &[[f32; 3]]) -> [f32; 3] {
    positions.iter().fold([0.0; 3], |acc, p| {
        [acc[0].max(p[0]), acc[1].max(p[1]), acc[2].max(p[2])]
    })
}

/// Appends `bytes` as a new buffer view with one accessor over it; returns
/// the accessor index. Views are padded to four-byte alignment.
fn push_view(
    buffer: &mut Vec<u8>,
    views: &mut Vec<Value>,
    accessors: &mut Vec<Value>,
    bytes: &[u8],
    mut accessor: Value,
) -> usize {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
    views.push(json!({"buffer": 0, "byteOffset": buffer.len(), "byteLength": bytes.len()}));
    buffer.extend_from_slice(bytes);
    accessor["bufferView"] = json!(views.len() - 1);
    accessors.push(accessor);
    accessors.len() - 1
}

fn material_json(
    name: &str,
    material: &MaterialFixture,
    textures: &mut Vec<Value>,
    images: &mut Vec<Value>,
) -> Value {
    match material {
        MaterialFixture::Static {
            base_color,
            metallic,
            roughness,
        } => json!({
            "name": name,
            "pbrMetallicRoughness": {
                "baseColorFactor": base_color,
                "metallicFactor": metallic,
                "roughnessFactor": roughness,
            },
        }),
        MaterialFixture::Packed { base_color, packed } => {
            let mut texture = |label: &str, rgba: [u8; 4]| {
                images.push(json!({
                    "name": format!("{name}_{label}"),
                    "uri": data_uri("image/png", &solid_png(4, 4, rgba)),
                }));
                textures.push(json!({"source": images.len() - 1}));
                textures.len() - 1
            };
            let base = texture("albedo", *base_color);
            let orm = texture("orm", *packed);
            json!({
                "name": name,
                "pbrMetallicRoughness": {
                    "baseColorTexture": {"index": base},
                    "metallicRoughnessTexture": {"index": orm},
                },
            })
        }
    }
}
