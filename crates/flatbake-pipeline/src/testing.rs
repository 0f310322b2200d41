//! Fake collaborators and fixture builders shared by the unit tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use flatbake_backend_raster::RasterEngine;
use flatbake_scene::{
    socket, BakeEngine, BakeError, BakeMode, BakeRequest, BakeStats, ColorSpace, ExportError,
    ExportOptions, Image, ImageId, ImageRegistry, ImageStore, ImportError, MaterialGraph,
    MeshObject, NodeId, NodeKind, RenderConfig, Scene, SceneExporter, SceneImporter,
    SocketValue, StoreError, UvLayer,
};

pub const BASE: [f32; 4] = [0.9, 0.6, 0.2, 1.0];

/// A unit quad whose UV layer covers the whole texture.
pub fn full_quad(name: &str) -> MeshObject {
    bare_quad(name).with_uv(UvLayer::new(
        "UVMap",
        vec![
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            [[0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        ],
    ))
}

/// A unit quad without UVs.
pub fn bare_quad(name: &str) -> MeshObject {
    MeshObject::new(
        name,
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Hub wired into an output, with static channel values.
pub fn static_material(base: [f32; 4], metallic: f32, roughness: f32) -> (MaterialGraph, NodeId) {
    let mut graph = MaterialGraph::new();
    let hub = graph.add_node(NodeKind::PrincipledBsdf);
    let out = graph.add_node(NodeKind::MaterialOutput);
    graph.connect(hub, socket::BSDF, out, socket::SURFACE).unwrap();
    graph
        .set_input_value(hub, socket::BASE_COLOR, SocketValue::Color(base))
        .unwrap();
    graph
        .set_input_value(hub, socket::METALLIC, SocketValue::Float(metallic))
        .unwrap();
    graph
        .set_input_value(hub, socket::ROUGHNESS, SocketValue::Float(roughness))
        .unwrap();
    (graph, hub)
}

/// Metallic driven by the blue channel of a packed texture.
pub fn packed_metal(images: &mut ImageRegistry, blue: f32) -> (MaterialGraph, NodeId) {
    let (mut graph, hub) = static_material(BASE, 0.0, 0.5);
    let packed = images.create("packed", 4, 4, ColorSpace::NonColor, [0.0, 0.3, blue, 1.0]);
    let tex = graph.add_node(NodeKind::ImageTexture {
        image: Some(packed),
    });
    let split = graph.add_node(NodeKind::SeparateColor);
    graph.connect(tex, socket::COLOR, split, socket::COLOR).unwrap();
    graph.connect(split, socket::BLUE, hub, socket::METALLIC).unwrap();
    graph.connect(split, socket::GREEN, hub, socket::ROUGHNESS).unwrap();
    (graph, hub)
}

/// Keeps every persisted image in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub persisted: Vec<Image>,
    pub fail_on: Option<String>,
}

impl ImageStore for MemoryStore {
    fn persist(&mut self, image: &mut Image) -> Result<PathBuf, StoreError> {
        if self.fail_on.as_deref() == Some(image.name.as_str()) {
            return Err(StoreError::Encoding {
                name: image.name.clone(),
                message: "refused".to_string(),
            });
        }
        let path = PathBuf::from(format!("/memory/{}.png", image.name));
        image.filepath = Some(path.clone());
        self.persisted.push(image.clone());
        Ok(path)
    }
}

/// Raster engine that records its configuration and every bake mode, and can
/// be told to fail one mode.
#[derive(Default)]
pub struct RecordingEngine {
    pub inner: RasterEngine,
    pub configs: Vec<RenderConfig>,
    pub modes: Vec<BakeMode>,
    pub fail_mode: Option<BakeMode>,
}

impl RecordingEngine {
    pub fn failing(mode: BakeMode) -> Self {
        Self {
            fail_mode: Some(mode),
            ..Self::default()
        }
    }
}

impl BakeEngine for RecordingEngine {
    fn configure(&mut self, config: &RenderConfig) {
        self.configs.push(config.clone());
        self.inner.configure(config);
    }

    fn bake(&mut self, request: BakeRequest<'_>) -> Result<BakeStats, BakeError> {
        self.modes.push(request.mode);
        if self.fail_mode == Some(request.mode) {
            return Err(BakeError::engine("device lost"));
        }
        self.inner.bake(request)
    }
}

/// Hands out a prepared scene.
pub struct StaticImporter(pub Scene);

impl SceneImporter for StaticImporter {
    fn import(&self, _path: &Path) -> Result<Scene, ImportError> {
        Ok(self.0.clone())
    }
}

/// Records every exported scene and optionally writes a placeholder file.
pub struct RecordingExporter {
    pub scenes: RefCell<Vec<Scene>>,
    pub write_file: bool,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self {
            scenes: RefCell::new(Vec::new()),
            write_file: true,
        }
    }

    pub fn silent() -> Self {
        Self {
            write_file: false,
            ..Self::new()
        }
    }
}

impl SceneExporter for RecordingExporter {
    fn export(&self, scene: &Scene, path: &Path, _options: &ExportOptions) -> Result<(), ExportError> {
        self.scenes.borrow_mut().push(scene.clone());
        if self.write_file {
            std::fs::write(path, b"exported").map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Image a graph's image node carries.
pub fn image_of(graph: &MaterialGraph, node: NodeId) -> ImageId {
    graph.node(node).unwrap().kind().image().unwrap()
}
