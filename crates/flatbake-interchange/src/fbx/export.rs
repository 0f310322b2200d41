//! Scene export to binary FBX.
//!
//! The FBX material model only knows textures plugged straight into a
//! material property. Textures are therefore recognized only where an image
//! node is linked directly into a shader hub input; anything routed through
//! intermediate nodes is dropped and the hub's static value is written
//! instead.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use flatbake_scene::graph::{socket, NodeKind};
use flatbake_scene::{
    ExportError, ExportOptions, Material, MaterialId, MeshObject, ScaleMode, Scene, SceneExporter,
};

use super::node::{p70_color, p70_double, p70_int, p70_number, Document, Node, Property};
use super::writer::{to_bytes, VERSION};

/// Hub inputs that can carry a texture, with the FBX material property each
/// maps to.
pub const TEXTURE_SLOTS: [(&str, &str); 5] = [
    (socket::BASE_COLOR, "DiffuseColor"),
    (socket::METALLIC, "ReflectionFactor"),
    (socket::ROUGHNESS, "ShininessExponent"),
    (socket::ALPHA, "TransparencyFactor"),
    (socket::EMISSION_COLOR, "EmissiveColor"),
];

/// Static material values written when a hub input carries no texture.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SurfaceValues {
    base_color: [f32; 4],
    metallic: f32,
    roughness: f32,
    alpha: f32,
    emission: [f32; 4],
}

impl Default for SurfaceValues {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            alpha: 1.0,
            emission: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Exponent written for a given roughness.
fn shininess(roughness: f32) -> f64 {
    ((1.0 - roughness.clamp(0.0, 1.0)) * 100.0) as f64
}

fn rgb(c: [f32; 4]) -> [f64; 3] {
    [c[0] as f64, c[1] as f64, c[2] as f64]
}

/// Allocates object ids. Zero is the scene root.
struct Ids(i64);

impl Ids {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[derive(Default)]
struct Builder {
    objects: Vec<Node>,
    connections: Vec<Node>,
    counts: BTreeMap<&'static str, i32>,
    materials: BTreeMap<MaterialId, i64>,
}

impl Builder {
    fn add(&mut self, class: &'static str, node: Node) {
        *self.counts.entry(class).or_default() += 1;
        self.objects.push(node);
    }

    fn connect(&mut self, child: i64, parent: i64) {
        self.connections
            .push(Node::new("C").prop("OO").prop(child).prop(parent));
    }

    fn connect_property(&mut self, child: i64, parent: i64, property: &str) {
        self.connections.push(
            Node::new("C")
                .prop("OP")
                .prop(child)
                .prop(parent)
                .prop(property),
        );
    }
}

/// Binary FBX 7.4 exporter.
#[derive(Debug, Clone, Default)]
pub struct FbxExporter;

impl FbxExporter {
    /// Creates an exporter.
    pub fn new() -> Self {
        Self
    }

    /// Builds the FBX document for a scene without writing it.
    pub fn document(&self, scene: &Scene, options: &ExportOptions) -> Result<Document, ExportError> {
        let (vertex_scale, unit_scale) = match options.scale_mode {
            ScaleMode::FbxAll => (options.global_scale, 1.0),
            ScaleMode::FbxUnits => (1.0, options.global_scale * 100.0),
        };

        let mut ids = Ids(1_000_000);
        let mut builder = Builder::default();

        for object in &scene.objects {
            let geometry_id = ids.next();
            let model_id = ids.next();
            builder.add("Geometry", geometry(geometry_id, object, vertex_scale)?);
            builder.add(
                "Model",
                Node::new("Model")
                    .prop(model_id)
                    .prop(Property::object_name(&object.name, "Model"))
                    .prop("Mesh")
                    .child(Node::leaf("Version", 232))
                    .child(Node::leaf("Culling", "CullingOff")),
            );
            builder.connect(model_id, 0);
            builder.connect(geometry_id, model_id);

            let Some(material_id) = object.primary_material() else {
                continue;
            };
            let Some(material) = scene.material(material_id) else {
                warn!(object = %object.name, material = %material_id, "Material slot points at a missing material");
                continue;
            };
            let fbx_id = match builder.materials.get(&material_id).copied() {
                Some(id) => id,
                None => {
                    let id = add_material(&mut builder, &mut ids, scene, material, options)?;
                    builder.materials.insert(material_id, id);
                    id
                }
            };
            builder.connect(fbx_id, model_id);
        }

        let total: i32 = builder.counts.values().sum::<i32>() + 1;
        let mut definitions = Node::new("Definitions")
            .child(Node::leaf("Version", 100))
            .child(Node::leaf("Count", total))
            .child(Node::new("ObjectType").prop("GlobalSettings").child(Node::leaf("Count", 1)));
        for (class, count) in &builder.counts {
            definitions = definitions.child(
                Node::new("ObjectType")
                    .prop(*class)
                    .child(Node::leaf("Count", *count)),
            );
        }

        let nodes = vec![
            Node::new("FBXHeaderExtension")
                .child(Node::leaf("FBXHeaderVersion", 1003))
                .child(Node::leaf("FBXVersion", VERSION as i32))
                .child(Node::leaf("Creator", "flatbake")),
            Node::new("GlobalSettings")
                .child(Node::leaf("Version", 1000))
                .child(Node::new("Properties70").children([
                    p70_int("UpAxis", 1),
                    p70_int("UpAxisSign", 1),
                    p70_int("FrontAxis", 2),
                    p70_int("FrontAxisSign", 1),
                    p70_int("CoordAxis", 0),
                    p70_int("CoordAxisSign", 1),
                    p70_double("UnitScaleFactor", unit_scale),
                    p70_double("OriginalUnitScaleFactor", unit_scale),
                ])),
            Node::new("Documents").child(Node::leaf("Count", 1)).child(
                Node::new("Document")
                    .prop(ids.next())
                    .prop("")
                    .prop("Scene")
                    .child(Node::leaf("RootNode", 0i64)),
            ),
            Node::new("References"),
            definitions,
            Node::new("Objects").children(builder.objects),
            Node::new("Connections").children(builder.connections),
        ];

        Ok(Document {
            version: VERSION,
            nodes,
        })
    }
}

impl SceneExporter for FbxExporter {
    fn export(&self, scene: &Scene, path: &Path, options: &ExportOptions) -> Result<(), ExportError> {
        let document = self.document(scene, options)?;
        let io_error = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = to_bytes(&document).map_err(io_error)?;
        std::fs::write(path, &bytes).map_err(io_error)?;
        info!(path = %path.display(), bytes = bytes.len(), "Wrote FBX");
        Ok(())
    }
}

fn geometry(id: i64, object: &MeshObject, scale: f64) -> Result<Node, ExportError> {
    let vertex_count = object.positions.len();
    let invalid = |message: String| ExportError::InvalidObject {
        object: object.name.clone(),
        message,
    };

    let vertices: Vec<f64> = object
        .positions
        .iter()
        .flat_map(|p| p.map(|c| c as f64 * scale))
        .collect();

    let mut polygon_indices = Vec::with_capacity(object.triangles.len() * 3);
    let mut normals = Vec::with_capacity(object.triangles.len() * 9);
    for (t, tri) in object.triangles.iter().enumerate() {
        let corners = object.triangle_positions(t).ok_or_else(|| {
            invalid(format!(
                "triangle {t} references a vertex beyond the {vertex_count} available"
            ))
        })?;
        let to_i32 = |v: u32| {
            i32::try_from(v).map_err(|_| invalid(format!("vertex index {v} does not fit in FBX")))
        };
        polygon_indices.push(to_i32(tri[0])?);
        polygon_indices.push(to_i32(tri[1])?);
        // The last corner of each polygon is stored bitwise-negated.
        polygon_indices.push(!to_i32(tri[2])?);

        let n = face_normal(corners);
        for _ in 0..3 {
            normals.extend(n);
        }
    }

    let corner_count = polygon_indices.len() as i32;
    let mut node = Node::new("Geometry")
        .prop(id)
        .prop(Property::object_name(&object.name, "Geometry"))
        .prop("Mesh")
        .child(Node::leaf("Vertices", Property::F64Array(vertices)))
        .child(Node::leaf(
            "PolygonVertexIndex",
            Property::I32Array(polygon_indices),
        ))
        .child(Node::leaf("GeometryVersion", 124))
        .child(
            Node::new("LayerElementNormal")
                .prop(0)
                .child(Node::leaf("Version", 101))
                .child(Node::leaf("Name", ""))
                .child(Node::leaf("MappingInformationType", "ByPolygonVertex"))
                .child(Node::leaf("ReferenceInformationType", "Direct"))
                .child(Node::leaf("Normals", Property::F64Array(normals))),
        );

    let mut layer = Node::new("Layer")
        .prop(0)
        .child(Node::leaf("Version", 100))
        .child(layer_element("LayerElementNormal"));

    if let Some(uv) = &object.uv {
        let coords: Vec<f64> = uv
            .corners
            .iter()
            .flatten()
            .flat_map(|c| [c[0] as f64, c[1] as f64])
            .collect();
        if coords.len() != corner_count as usize * 2 {
            return Err(invalid(format!(
                "UV layer '{}' has {} corners for {} triangles",
                uv.name,
                uv.corners.len(),
                object.triangles.len()
            )));
        }
        node = node.child(
            Node::new("LayerElementUV")
                .prop(0)
                .child(Node::leaf("Version", 101))
                .child(Node::leaf("Name", uv.name.as_str()))
                .child(Node::leaf("MappingInformationType", "ByPolygonVertex"))
                .child(Node::leaf("ReferenceInformationType", "IndexToDirect"))
                .child(Node::leaf("UV", Property::F64Array(coords)))
                .child(Node::leaf(
                    "UVIndex",
                    Property::I32Array((0..corner_count).collect()),
                )),
        );
        layer = layer.child(layer_element("LayerElementUV"));
    }

    node = node.child(
        Node::new("LayerElementMaterial")
            .prop(0)
            .child(Node::leaf("Version", 101))
            .child(Node::leaf("Name", ""))
            .child(Node::leaf("MappingInformationType", "AllSame"))
            .child(Node::leaf("ReferenceInformationType", "IndexToDirect"))
            .child(Node::leaf("Materials", Property::I32Array(vec![0]))),
    );
    layer = layer.child(layer_element("LayerElementMaterial"));

    Ok(node.child(layer))
}

fn layer_element(kind: &str) -> Node {
    Node::new("LayerElement")
        .child(Node::leaf("Type", kind))
        .child(Node::leaf("TypedIndex", 0))
}

fn face_normal(p: [[f32; 3]; 3]) -> [f64; 3] {
    let e1 = [p[1][0] - p[0][0], p[1][1] - p[0][1], p[1][2] - p[0][2]];
    let e2 = [p[2][0] - p[0][0], p[2][1] - p[0][1], p[2][2] - p[0][2]];
    let n = [
        (e1[1] * e2[2] - e1[2] * e2[1]) as f64,
        (e1[2] * e2[0] - e1[0] * e2[2]) as f64,
        (e1[0] * e2[1] - e1[1] * e2[0]) as f64,
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Reads the hub's static values. Non-node materials and graphs without a
/// unique hub export defaults.
fn surface_values(material: &Material) -> SurfaceValues {
    let mut values = SurfaceValues::default();
    if !material.use_nodes {
        return values;
    }
    let graph = &material.graph;
    let Ok(hub) = graph.shader_hub() else {
        return values;
    };
    let value = |input| graph.input_value(hub, input);
    if let Some(v) = value(socket::BASE_COLOR) {
        values.base_color = v.to_color();
    }
    if let Some(v) = value(socket::METALLIC) {
        values.metallic = v.to_float();
    }
    if let Some(v) = value(socket::ROUGHNESS) {
        values.roughness = v.to_float();
    }
    if let Some(v) = value(socket::ALPHA) {
        values.alpha = v.to_float();
    }
    if let (Some(color), Some(strength)) = (
        value(socket::EMISSION_COLOR),
        value(socket::EMISSION_STRENGTH),
    ) {
        let c = color.to_color();
        let s = strength.to_float();
        values.emission = [c[0] * s, c[1] * s, c[2] * s, 1.0];
    }
    values
}

fn add_material(
    builder: &mut Builder,
    ids: &mut Ids,
    scene: &Scene,
    material: &Material,
    options: &ExportOptions,
) -> Result<i64, ExportError> {
    let id = ids.next();
    let values = surface_values(material);

    builder.add(
        "Material",
        Node::new("Material")
            .prop(id)
            .prop(Property::object_name(&material.name, "Material"))
            .prop("")
            .child(Node::leaf("Version", 102))
            .child(Node::leaf("ShadingModel", "Phong"))
            .child(Node::leaf("MultiLayer", 0))
            .child(Node::new("Properties70").children([
                p70_color("DiffuseColor", rgb(values.base_color)),
                p70_number("DiffuseFactor", 1.0),
                p70_number("ReflectionFactor", values.metallic as f64),
                p70_number("ShininessExponent", shininess(values.roughness)),
                p70_number("TransparencyFactor", (1.0 - values.alpha) as f64),
                p70_color("EmissiveColor", rgb(values.emission)),
                p70_number("EmissiveFactor", 1.0),
            ])),
    );

    if !material.use_nodes {
        return Ok(id);
    }
    let graph = &material.graph;
    let Ok(hub) = graph.shader_hub() else {
        return Ok(id);
    };

    for (input, property) in TEXTURE_SLOTS {
        let Some(link) = graph.link_into(hub, input) else {
            continue;
        };
        let image_id = match graph.node(link.from_node).map(|n| *n.kind()) {
            Some(NodeKind::ImageTexture { image: Some(image) }) => image,
            _ => {
                debug!(
                    material = %material.name,
                    input,
                    "Input is not driven directly by an image; writing its static value"
                );
                continue;
            }
        };
        let Some(image) = scene.images.get(image_id) else {
            continue;
        };
        let Some(path) = image.filepath.as_deref() else {
            warn!(
                material = %material.name,
                image = %image.name,
                "Image has no backing file and cannot be referenced"
            );
            continue;
        };

        let texture_id = ids.next();
        let video_id = ids.next();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_path = path.to_string_lossy().into_owned();

        let mut video = Node::new("Video")
            .prop(video_id)
            .prop(Property::object_name(&image.name, "Video"))
            .prop("Clip")
            .child(Node::leaf("Type", "Clip"))
            .child(Node::leaf("UseMipMap", 0))
            .child(Node::leaf("Filename", file_path.as_str()))
            .child(Node::leaf("RelativeFilename", file_name.as_str()));
        if options.embed_textures {
            let content = std::fs::read(path).map_err(|source| ExportError::Texture {
                name: image.name.clone(),
                path: path.to_path_buf(),
                source,
            })?;
            video = video.child(Node::leaf("Content", Property::Raw(content)));
        }

        builder.add(
            "Texture",
            Node::new("Texture")
                .prop(texture_id)
                .prop(Property::object_name(&image.name, "Texture"))
                .prop("")
                .child(Node::leaf("Type", "TextureVideoClip"))
                .child(Node::leaf("Version", 202))
                .child(Node::leaf(
                    "TextureName",
                    Property::object_name(&image.name, "Texture"),
                ))
                .child(Node::leaf("Media", Property::object_name(&image.name, "Video")))
                .child(Node::leaf("FileName", file_path.as_str()))
                .child(Node::leaf("RelativeFilename", file_name.as_str())),
        );
        builder.add("Video", video);
        builder.connect(video_id, texture_id);
        builder.connect_property(texture_id, id, property);
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fbx::reader::from_bytes;
    use flatbake_scene::graph::{MaterialGraph, MathOp, SocketValue};
    use flatbake_scene::{ColorSpace, Image, UvLayer};

    fn quad() -> MeshObject {
        MeshObject::new(
            "Quad",
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .with_uv(UvLayer::new(
            "UVMap",
            vec![
                [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
                [[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            ],
        ))
    }

    /// Scene whose material has a direct base color texture and a metallic
    /// texture routed through a math node.
    fn textured_scene(dir: &Path) -> Scene {
        let mut scene = Scene::new();
        let png = dir.join("base.png");
        std::fs::write(&png, b"not really a png").unwrap();
        let mut base = Image::new("base", 2, 2, ColorSpace::Srgb, [1.0; 4]);
        base.filepath = Some(png);
        let base = scene.images.insert(base);
        let mut metal = Image::new("metal", 2, 2, ColorSpace::NonColor, [1.0; 4]);
        metal.filepath = Some(dir.join("metal.png"));
        let metal = scene.images.insert(metal);

        let mut graph = MaterialGraph::new();
        let hub = graph.add_node(NodeKind::PrincipledBsdf);
        let out = graph.add_node(NodeKind::MaterialOutput);
        graph.connect(hub, socket::BSDF, out, socket::SURFACE).unwrap();
        let base_tex = graph.add_node(NodeKind::ImageTexture { image: Some(base) });
        graph.connect(base_tex, socket::COLOR, hub, socket::BASE_COLOR).unwrap();
        let metal_tex = graph.add_node(NodeKind::ImageTexture { image: Some(metal) });
        let math = graph.add_node(NodeKind::Math { op: MathOp::Multiply });
        graph.connect(metal_tex, socket::COLOR, math, socket::A).unwrap();
        graph.connect(math, socket::VALUE, hub, socket::METALLIC).unwrap();
        graph
            .set_input_value(hub, socket::ROUGHNESS, SocketValue::Float(0.25))
            .unwrap();

        let material = scene.add_material(Material::with_graph("Mat", graph));
        scene.objects.push(quad().with_material_slot(Some(material)));
        scene
    }

    fn objects(doc: &Document) -> &Node {
        doc.find("Objects").unwrap()
    }

    #[test]
    fn test_only_direct_textures_are_exported() {
        let dir = tempfile::tempdir().unwrap();
        let scene = textured_scene(dir.path());
        let doc = FbxExporter::new()
            .document(&scene, &ExportOptions::default())
            .unwrap();

        let objects = objects(&doc);
        assert_eq!(objects.find_all("Texture").count(), 1);
        let video = objects.find("Video").unwrap();
        assert_eq!(
            video.find("Content").unwrap().properties[0],
            Property::Raw(b"not really a png".to_vec())
        );

        let op: Vec<&Node> = doc
            .find("Connections")
            .unwrap()
            .children
            .iter()
            .filter(|c| c.properties[0].as_str() == Some("OP"))
            .collect();
        assert_eq!(op.len(), 1);
        assert_eq!(op[0].properties[3].as_str(), Some("DiffuseColor"));
    }

    #[test]
    fn test_geometry_layout() {
        let dir = tempfile::tempdir().unwrap();
        let scene = textured_scene(dir.path());
        let doc = FbxExporter::new()
            .document(&scene, &ExportOptions::default())
            .unwrap();
        let geometry = objects(&doc).find("Geometry").unwrap();

        assert_eq!(
            geometry.find("PolygonVertexIndex").unwrap().properties[0],
            Property::I32Array(vec![0, 1, -3, 0, 2, -4])
        );
        let uv = geometry.find("LayerElementUV").unwrap();
        assert_eq!(uv.find("Name").unwrap().properties[0].as_str(), Some("UVMap"));
        match &uv.find("UV").unwrap().properties[0] {
            Property::F64Array(values) => assert_eq!(values.len(), 12),
            other => panic!("unexpected UV property {other:?}"),
        }
    }

    #[test]
    fn test_scale_modes() {
        let mut scene = Scene::new();
        scene.objects.push(quad());
        let vertices = |doc: &Document| match &objects(doc).find("Geometry").unwrap().find("Vertices").unwrap().properties[0] {
            Property::F64Array(v) => v.clone(),
            _ => unreachable!(),
        };

        let all = ExportOptions {
            global_scale: 2.0,
            ..ExportOptions::default()
        };
        let doc = FbxExporter::new().document(&scene, &all).unwrap();
        assert_eq!(vertices(&doc)[3], 2.0);

        let units = ExportOptions {
            scale_mode: ScaleMode::FbxUnits,
            global_scale: 2.0,
            ..ExportOptions::default()
        };
        let doc = FbxExporter::new().document(&scene, &units).unwrap();
        assert_eq!(vertices(&doc)[3], 1.0);
        let settings = doc.find("GlobalSettings").unwrap().find("Properties70").unwrap();
        let unit = settings
            .children
            .iter()
            .find(|p| p.properties[0].as_str() == Some("UnitScaleFactor"))
            .unwrap();
        assert_eq!(unit.properties[4].as_f64(), Some(200.0));
    }

    #[test]
    fn test_missing_texture_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let scene = textured_scene(dir.path());
        std::fs::remove_file(dir.path().join("base.png")).unwrap();

        let err = FbxExporter::new()
            .document(&scene, &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::Texture { .. }));

        let no_embed = ExportOptions {
            embed_textures: false,
            ..ExportOptions::default()
        };
        assert!(FbxExporter::new().document(&scene, &no_embed).is_ok());
    }

    #[test]
    fn test_invalid_index_is_rejected() {
        let mut scene = Scene::new();
        scene
            .objects
            .push(MeshObject::new("Bad", vec![[0.0; 3]], vec![[0, 1, 2]]));
        let err = FbxExporter::new()
            .document(&scene, &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidObject { .. }));
    }

    #[test]
    fn test_export_writes_parseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let scene = textured_scene(dir.path());
        let out = dir.path().join("out.fbx");
        FbxExporter::new()
            .export(&scene, &out, &ExportOptions::default())
            .unwrap();

        let doc = from_bytes(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(doc.version, VERSION);
        let material = objects(&doc).find("Material").unwrap();
        assert_eq!(
            material.properties[1],
            Property::object_name("Mat", "Material")
        );
    }

    #[test]
    fn test_legacy_material_exports_defaults() {
        let mut scene = Scene::new();
        let material = scene.add_material(Material::legacy("Old"));
        scene.objects.push(quad().with_material_slot(Some(material)));
        let doc = FbxExporter::new()
            .document(&scene, &ExportOptions::default())
            .unwrap();
        assert_eq!(objects(&doc).find_all("Material").count(), 1);
        assert_eq!(objects(&doc).find_all("Texture").count(), 0);
    }
}
