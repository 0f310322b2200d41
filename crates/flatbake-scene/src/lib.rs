//! flatbake Scene Model
//!
//! This crate provides the data model shared by every flatbake crate: the
//! imported scene, its mesh objects and UV layers, material node graphs,
//! raster images, the fixed channel descriptor table, the render
//! configuration, and the collaborator port traits the pipeline drives.
//!
//! # Overview
//!
//! A [`Scene`] owns three arenas:
//!
//! - **Objects**: [`MeshObject`]s with geometry, an optional [`UvLayer`] and
//!   material slots.
//! - **Materials**: [`Material`]s addressed by [`MaterialId`]. Each node-based
//!   material carries a [`MaterialGraph`] of shading nodes and links.
//! - **Images**: an [`ImageRegistry`] of linear-float raster images addressed
//!   by [`ImageId`].
//!
//! Material graphs are explicit owned structures. Every node and link is
//! addressed through a stable handle ([`NodeId`], [`LinkId`]), so callers can
//! snapshot a graph, mutate it, and put it back exactly as it was.
//!
//! # Example
//!
//! ```
//! use flatbake_scene::graph::{socket, MaterialGraph, NodeKind};
//!
//! let mut graph = MaterialGraph::new();
//! let hub = graph.add_node(NodeKind::PrincipledBsdf);
//! let output = graph.add_node(NodeKind::MaterialOutput);
//! graph.connect(hub, socket::BSDF, output, socket::SURFACE).unwrap();
//!
//! assert_eq!(graph.shader_hub(), Ok(hub));
//! assert_eq!(graph.output(), Ok(output));
//! ```
//!
//! # Modules
//!
//! - [`channel`]: Channel descriptor table
//! - [`error`]: Error types shared across crates
//! - [`graph`]: Material node graphs
//! - [`image`]: Raster images and color transfer
//! - [`mesh`]: Mesh objects, UV layers and the scene container
//! - [`ports`]: Collaborator traits (import, bake, unwrap, persist, export)
//! - [`render`]: Render/bake configuration

pub mod channel;
pub mod error;
pub mod graph;
pub mod image;
pub mod mesh;
pub mod ports;
pub mod render;

// Re-export commonly used types at the crate root
pub use channel::{
    Channel, ChannelDescriptor, ChannelSemantics, ExtractionStrategy, CHANNELS,
};
pub use error::{
    BakeError, BakeTargetError, ExportError, FlatbakeError, GraphError, ImportError,
    RoleLookupError, StoreError, UnwrapError,
};
pub use graph::{
    socket, GraphSnapshot, Link, LinkId, Material, MaterialGraph, Node, NodeId, NodeKind, Role,
    SelectionState, SocketValue,
};
pub use image::{ColorSpace, Image, ImageId, ImageRegistry};
pub use mesh::{MaterialId, MeshObject, Scene, UvLayer};
pub use ports::{
    BakeEngine, BakeRequest, BakeStats, ExportOptions, ImageStore, ScaleMode, SceneExporter,
    SceneImporter, Unwrapper,
};
pub use render::{BakeMode, ComputeDevice, MarginType, NativePass, RenderConfig, RenderEngine};
