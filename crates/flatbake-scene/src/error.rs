//! Error types shared by the scene model and the collaborator ports.

use std::path::PathBuf;
use thiserror::Error;

use crate::graph::{NodeId, Role};
use crate::image::ImageId;

/// Trait implemented by every flatbake error type.
///
/// Provides a stable error code and a category so errors from different
/// crates can be reported uniformly.
///
/// # Example
///
/// ```
/// use flatbake_scene::error::{FlatbakeError, UnwrapError};
///
/// fn describe<E: FlatbakeError>(err: E) -> String {
///     format!("[{}] {}", err.code(), err.message())
/// }
///
/// assert!(describe(UnwrapError::NoFaces).starts_with("[UNWRAP_001]"));
/// ```
pub trait FlatbakeError: std::error::Error {
    /// Get the error code for reporting.
    ///
    /// Returns a static string like "BAKE_001", "EXPORT_002", etc.
    fn code(&self) -> &'static str;

    /// Get a human-readable message describing the error.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Get the error category for grouping related errors.
    fn category(&self) -> &'static str;
}

/// Errors from material graph mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node handle does not exist in this graph.
    #[error("Node {0} does not exist in this graph")]
    UnknownNode(NodeId),

    /// The source node has no output socket with this name.
    #[error("Node {node} has no output socket '{socket}'")]
    UnknownOutput { node: NodeId, socket: String },

    /// The destination node has no input socket with this name.
    #[error("Node {node} has no input socket '{socket}'")]
    UnknownInput { node: NodeId, socket: String },

    /// A node cannot be linked to itself.
    #[error("Cannot link node {0} to itself")]
    SelfLink(NodeId),
}

impl FlatbakeError for GraphError {
    fn code(&self) -> &'static str {
        match self {
            GraphError::UnknownNode(_) => "GRAPH_001",
            GraphError::UnknownOutput { .. } => "GRAPH_002",
            GraphError::UnknownInput { .. } => "GRAPH_003",
            GraphError::SelfLink(_) => "GRAPH_004",
        }
    }

    fn category(&self) -> &'static str {
        "graph"
    }
}

/// Result of a role-based node lookup that did not find exactly one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoleLookupError {
    /// No node plays this role.
    #[error("Material graph has no {0} node")]
    Missing(Role),

    /// More than one node plays this role.
    #[error("Material graph has {count} {role} nodes, expected exactly one")]
    Ambiguous { role: Role, count: usize },
}

/// Errors resolving the single bake target of a material graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BakeTargetError {
    /// No image node is selected.
    #[error("No image node is selected as bake target")]
    NoBakeTarget,

    /// More than one image node is selected.
    #[error("{count} image nodes are selected; the bake target is ambiguous")]
    AmbiguousBakeTarget { count: usize },

    /// The selected image node carries no image.
    #[error("Bake target node {0} has no image assigned")]
    TargetImageMissing(NodeId),
}

/// Errors from a bake engine invocation.
#[derive(Debug, Error)]
pub enum BakeError {
    /// The bake target could not be resolved.
    #[error(transparent)]
    Target(#[from] BakeTargetError),

    /// The target image handle is not present in the registry.
    #[error("Bake target image {0} is not registered")]
    UnknownImage(ImageId),

    /// The mesh has no UV layer to bake over.
    #[error("Mesh '{object}' has no UV layer to bake over")]
    MissingUvLayer { object: String },

    /// The output node's surface input is not linked to a shader.
    #[error("Material output has no surface shader")]
    NoSurfaceShader,

    /// The graph contains a dependency cycle reachable from the surface.
    #[error("Cycle detected while evaluating node {0}")]
    GraphCycle(NodeId),

    /// The graph has no output node to bake from.
    #[error(transparent)]
    Role(#[from] RoleLookupError),

    /// The engine failed for another reason.
    #[error("Bake failed: {message}")]
    Engine { message: String },
}

impl BakeError {
    /// Creates a new engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

impl FlatbakeError for BakeError {
    fn code(&self) -> &'static str {
        match self {
            BakeError::Target(BakeTargetError::NoBakeTarget) => "BAKE_001",
            BakeError::Target(BakeTargetError::AmbiguousBakeTarget { .. }) => "BAKE_002",
            BakeError::Target(BakeTargetError::TargetImageMissing(_)) => "BAKE_003",
            BakeError::UnknownImage(_) => "BAKE_004",
            BakeError::MissingUvLayer { .. } => "BAKE_005",
            BakeError::NoSurfaceShader => "BAKE_006",
            BakeError::GraphCycle(_) => "BAKE_007",
            BakeError::Role(_) => "BAKE_008",
            BakeError::Engine { .. } => "BAKE_009",
        }
    }

    fn category(&self) -> &'static str {
        "bake"
    }
}

/// Errors from automatic UV unwrapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnwrapError {
    /// The mesh has no faces.
    #[error("Mesh has no faces to unwrap")]
    NoFaces,

    /// Every face of the mesh has zero area.
    #[error("Mesh has zero surface area")]
    Degenerate,

    /// A triangle references a vertex that does not exist.
    #[error("Triangle {triangle} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        vertex: u32,
        vertex_count: usize,
    },
}

impl FlatbakeError for UnwrapError {
    fn code(&self) -> &'static str {
        match self {
            UnwrapError::NoFaces => "UNWRAP_001",
            UnwrapError::Degenerate => "UNWRAP_002",
            UnwrapError::IndexOutOfRange { .. } => "UNWRAP_003",
        }
    }

    fn category(&self) -> &'static str {
        "unwrap"
    }
}

/// Errors from persisting an image to the temporary store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error while writing the image.
    #[error("Failed to write image '{name}' to {path}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder rejected the image.
    #[error("Failed to encode image '{name}': {message}")]
    Encoding { name: String, message: String },
}

impl FlatbakeError for StoreError {
    fn code(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "STORE_001",
            StoreError::Encoding { .. } => "STORE_002",
        }
    }

    fn category(&self) -> &'static str {
        "store"
    }
}

/// Errors from scene import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file could not be read or parsed.
    #[error("Failed to read scene {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// The file uses a feature the importer does not support.
    #[error("Unsupported scene content in {path}: {message}")]
    Unsupported { path: PathBuf, message: String },
}

impl FlatbakeError for ImportError {
    fn code(&self) -> &'static str {
        match self {
            ImportError::Read { .. } => "IMPORT_001",
            ImportError::Unsupported { .. } => "IMPORT_002",
        }
    }

    fn category(&self) -> &'static str {
        "import"
    }
}

/// Errors from scene export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error while writing the output file.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image referenced by an exported material could not be read back.
    #[error("Failed to embed texture '{name}' from {path}: {source}")]
    Texture {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scene contains data that cannot be expressed in the output format.
    #[error("Cannot export object '{object}': {message}")]
    InvalidObject { object: String, message: String },
}

impl FlatbakeError for ExportError {
    fn code(&self) -> &'static str {
        match self {
            ExportError::Io { .. } => "EXPORT_001",
            ExportError::Texture { .. } => "EXPORT_002",
            ExportError::InvalidObject { .. } => "EXPORT_003",
        }
    }

    fn category(&self) -> &'static str {
        "export"
    }
}
