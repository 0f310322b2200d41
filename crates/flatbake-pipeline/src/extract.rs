//! Channel extraction.
//!
//! Substitution bakes reroute a channel's signal through a temporary
//! emitter and capture raw emission, which sees the signal verbatim no matter
//! what the surface physics would do with it (a diffuse capture of a metal
//! comes back black). Every mutation of the source graph is undone before
//! [`extract_channel`] returns, on success and on failure alike.

use std::path::PathBuf;

use tracing::{debug, warn};

use flatbake_scene::{
    socket, BakeEngine, BakeError, BakeMode, BakeRequest, BakeStats, ChannelDescriptor,
    ExtractionStrategy, GraphError, ImageId, ImageRegistry, ImageStore, MaterialGraph,
    MeshObject, NodeId, NodeKind, SocketValue,
};

use crate::error::ExtractError;
use crate::native::bake_native;
use crate::report::ChannelUnavailable;

/// Collaborators and settings every extraction needs.
pub struct BakeContext<'a> {
    pub engine: &'a mut dyn BakeEngine,
    pub store: &'a mut dyn ImageStore,
    /// Width and height of every baked image.
    pub resolution: u32,
}

/// How an extraction produced its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Captured by the engine.
    Baked { covered_texels: u64 },
    /// The graph could not be baked; the image holds the channel default.
    Defaulted(ChannelUnavailable),
}

/// A persisted channel image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub image: ImageId,
    pub path: PathBuf,
    pub outcome: ExtractionOutcome,
}

/// Captures one channel with the strategy its descriptor names.
pub fn capture_channel(
    ctx: &mut BakeContext<'_>,
    mesh: &MeshObject,
    graph: &mut MaterialGraph,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
) -> Result<Extraction, ExtractError> {
    match descriptor.strategy {
        ExtractionStrategy::Substitution => extract_channel(ctx, mesh, graph, images, descriptor),
        ExtractionStrategy::Native(pass) => bake_native(ctx, mesh, graph, images, descriptor, pass),
    }
}

/// Substitution bake of one channel.
///
/// Returns a default-filled image when the graph has no unique hub or output.
pub fn extract_channel(
    ctx: &mut BakeContext<'_>,
    mesh: &MeshObject,
    graph: &mut MaterialGraph,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
) -> Result<Extraction, ExtractError> {
    let image = allocate(ctx, mesh, images, descriptor);
    let (hub, output) = match locate_roles(graph) {
        Ok(roles) => roles,
        Err(reason) => return defaulted(ctx, mesh, images, descriptor, image, reason),
    };

    let selection = graph.selection();
    let surface = graph.disconnect(output, socket::SURFACE);
    let emitter = graph.add_node(NodeKind::Emission);
    let target = graph.add_node(NodeKind::ImageTexture { image: Some(image) });

    let baked = substitute_and_bake(ctx, mesh, graph, images, descriptor, hub, output, emitter, target);

    graph.remove_node(target);
    graph.remove_node(emitter);
    let restored = match surface {
        Some((id, link)) => graph.restore_link(id, link),
        None => Ok(()),
    };
    graph.restore_selection(&selection);

    let stats = baked?;
    restored?;
    let path = persist(ctx, images, image)?;
    debug!(channel = %descriptor.channel, covered = stats.covered_texels, "substitution bake done");
    Ok(Extraction {
        image,
        path,
        outcome: ExtractionOutcome::Baked {
            covered_texels: stats.covered_texels,
        },
    })
}

#[allow(clippy::too_many_arguments)]
fn substitute_and_bake(
    ctx: &mut BakeContext<'_>,
    mesh: &MeshObject,
    graph: &mut MaterialGraph,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
    hub: NodeId,
    output: NodeId,
    emitter: NodeId,
    target: NodeId,
) -> Result<BakeStats, ExtractError> {
    match graph.link_into(hub, descriptor.hub_input).copied() {
        Some(upstream) => {
            graph.connect(upstream.from_node, upstream.from_socket, emitter, socket::COLOR)?;
        }
        None => {
            let value = graph
                .input_value(hub, descriptor.hub_input)
                .ok_or_else(|| GraphError::UnknownInput {
                    node: hub,
                    socket: descriptor.hub_input.to_string(),
                })?;
            let mut color = value.to_color();
            color[3] = 1.0;
            graph.set_input_value(emitter, socket::COLOR, SocketValue::Color(color))?;
        }
    }
    graph.connect(emitter, socket::EMISSION, output, socket::SURFACE)?;
    graph.select_only(target)?;

    let stats = ctx.engine.bake(BakeRequest {
        mode: BakeMode::Emit,
        mesh,
        material: &*graph,
        images: &mut *images,
    })?;
    Ok(stats)
}

/// Allocates the channel's target image, pre-filled with its default.
pub(crate) fn allocate(
    ctx: &BakeContext<'_>,
    mesh: &MeshObject,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
) -> ImageId {
    images.create(
        descriptor.image_name(&mesh.name),
        ctx.resolution,
        ctx.resolution,
        descriptor.semantics.color_space(),
        descriptor.semantics.default_fill(),
    )
}

/// Finds the unique hub and output nodes.
pub(crate) fn locate_roles(graph: &MaterialGraph) -> Result<(NodeId, NodeId), ChannelUnavailable> {
    let hub = graph.shader_hub().map_err(ChannelUnavailable::from_lookup)?;
    let output = graph.output().map_err(ChannelUnavailable::from_lookup)?;
    Ok((hub, output))
}

/// Persists the untouched default image.
pub(crate) fn defaulted(
    ctx: &mut BakeContext<'_>,
    mesh: &MeshObject,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
    image: ImageId,
    reason: ChannelUnavailable,
) -> Result<Extraction, ExtractError> {
    warn!(
        object = %mesh.name,
        channel = %descriptor.channel,
        "{}; using default fill",
        reason
    );
    let path = persist(ctx, images, image)?;
    Ok(Extraction {
        image,
        path,
        outcome: ExtractionOutcome::Defaulted(reason),
    })
}

pub(crate) fn persist(
    ctx: &mut BakeContext<'_>,
    images: &mut ImageRegistry,
    image: ImageId,
) -> Result<PathBuf, ExtractError> {
    let image = images.get_mut(image).ok_or(BakeError::UnknownImage(image))?;
    Ok(ctx.store.persist(image)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{full_quad, packed_metal, static_material, MemoryStore, RecordingEngine, BASE};
    use flatbake_scene::{Channel, ColorSpace, RenderConfig};
    use pretty_assertions::assert_eq;

    fn engine() -> RecordingEngine {
        let mut engine = RecordingEngine::default();
        engine.configure(&RenderConfig::default().samples(2).margin(1));
        engine
    }

    fn assert_close(actual: [f32; 4], expected: [f32; 4]) {
        for i in 0..4 {
            assert!(
                (actual[i] - expected[i]).abs() < 1e-4,
                "{:?} != {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_base_color_of_metal_is_captured_verbatim() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = static_material(BASE, 1.0, 0.5);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 8,
        };

        let extraction = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::BaseColor.descriptor(),
        )
        .unwrap();

        assert_eq!(
            extraction.outcome,
            ExtractionOutcome::Baked { covered_texels: 64 }
        );
        let image = images.get(extraction.image).unwrap();
        assert_eq!(image.name, "Cube_diffuse");
        assert_eq!(image.color_space, ColorSpace::Srgb);
        assert_close(image.get(3, 3), BASE);
        assert_eq!(extraction.path, PathBuf::from("/memory/Cube_diffuse.png"));
        assert_eq!(store.persisted.len(), 1);
        assert_eq!(engine.modes, vec![BakeMode::Emit]);
    }

    #[test]
    fn test_linked_source_is_routed_into_emitter() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = packed_metal(&mut images, 0.75);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        let extraction = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::Metallic.descriptor(),
        )
        .unwrap();

        let image = images.get(extraction.image).unwrap();
        assert_eq!(image.color_space, ColorSpace::NonColor);
        assert!(image.pixels.iter().all(|p| (p[0] - 0.75).abs() < 1e-4));
    }

    #[test]
    fn test_scalar_value_is_broadcast() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = static_material(BASE, 0.25, 0.5);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        let extraction = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::Metallic.descriptor(),
        )
        .unwrap();

        assert_close(images.get(extraction.image).unwrap().get(1, 1), [0.25, 0.25, 0.25, 1.0]);
    }

    #[test]
    fn test_graph_is_restored_after_success() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, hub) = packed_metal(&mut images, 1.0);
        graph.select_only(hub).unwrap();
        let before = graph.snapshot();
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::Metallic.descriptor(),
        )
        .unwrap();

        assert_eq!(graph.snapshot(), before);
        assert_eq!(graph.active_node(), Some(hub));
    }

    #[test]
    fn test_graph_is_restored_after_bake_failure() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = packed_metal(&mut images, 1.0);
        let before = graph.snapshot();
        let surface_before = graph.link_into(graph.output().unwrap(), socket::SURFACE).copied();
        let mut engine = RecordingEngine::failing(BakeMode::Emit);
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        let err = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::BaseColor.descriptor(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::Bake(BakeError::Engine { .. })));
        assert_eq!(graph.snapshot(), before);
        assert_eq!(
            graph.link_into(graph.output().unwrap(), socket::SURFACE).copied(),
            surface_before
        );
        assert!(store.persisted.is_empty());
    }

    #[test]
    fn test_graph_is_restored_after_persist_failure() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = static_material(BASE, 0.0, 0.5);
        let before = graph.snapshot();
        let mut engine = engine();
        let mut store = MemoryStore {
            fail_on: Some("Cube_diffuse".to_string()),
            ..MemoryStore::default()
        };
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        let err = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::BaseColor.descriptor(),
        )
        .unwrap_err();

        assert!(matches!(err, ExtractError::Store(_)));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn test_missing_hub_yields_default_image() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let mut graph = MaterialGraph::new();
        let emit = graph.add_node(NodeKind::Emission);
        let out = graph.add_node(NodeKind::MaterialOutput);
        graph.connect(emit, socket::EMISSION, out, socket::SURFACE).unwrap();
        let before = graph.snapshot();
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 16,
        };

        let extraction = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::Metallic.descriptor(),
        )
        .unwrap();

        assert_eq!(
            extraction.outcome,
            ExtractionOutcome::Defaulted(ChannelUnavailable::MissingHubNode)
        );
        let image = images.get(extraction.image).unwrap();
        assert_eq!((image.width, image.height), (16, 16));
        assert!(image.is_uniform([0.5, 0.5, 0.5, 1.0]));
        assert!(engine.modes.is_empty());
        assert_eq!(graph.snapshot(), before);
        assert_eq!(store.persisted.len(), 1);
    }

    #[test]
    fn test_missing_output_yields_light_color_default() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let mut graph = MaterialGraph::new();
        graph.add_node(NodeKind::PrincipledBsdf);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 8,
        };

        let extraction = extract_channel(
            &mut ctx,
            &mesh,
            &mut graph,
            &mut images,
            Channel::BaseColor.descriptor(),
        )
        .unwrap();

        assert_eq!(
            extraction.outcome,
            ExtractionOutcome::Defaulted(ChannelUnavailable::MissingOutputNode)
        );
        assert!(images
            .get(extraction.image)
            .unwrap()
            .is_uniform([0.8, 0.8, 0.8, 1.0]));
    }

    #[test]
    fn test_repeated_bake_is_pixel_identical() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = packed_metal(&mut images, 0.4);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 8,
        };
        let descriptor = Channel::Metallic.descriptor();

        let first = extract_channel(&mut ctx, &mesh, &mut graph, &mut images, descriptor).unwrap();
        let second = extract_channel(&mut ctx, &mesh, &mut graph, &mut images, descriptor).unwrap();

        assert_ne!(first.image, second.image);
        assert_eq!(
            images.get(first.image).unwrap().pixels,
            images.get(second.image).unwrap().pixels
        );
    }

    #[test]
    fn test_capture_dispatches_on_strategy() {
        let mesh = full_quad("Cube");
        let mut images = ImageRegistry::new();
        let (mut graph, _) = static_material(BASE, 1.0, 0.3);
        let mut engine = engine();
        let mut store = MemoryStore::default();
        let mut ctx = BakeContext {
            engine: &mut engine,
            store: &mut store,
            resolution: 4,
        };

        for descriptor in &flatbake_scene::CHANNELS {
            capture_channel(&mut ctx, &mesh, &mut graph, &mut images, descriptor).unwrap();
        }

        assert_eq!(
            engine.modes,
            vec![
                BakeMode::Emit,
                BakeMode::Native(flatbake_scene::NativePass::Roughness),
                BakeMode::Emit
            ]
        );
    }
}
