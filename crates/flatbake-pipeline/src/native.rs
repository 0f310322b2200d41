//! Native channel baking: the engine's own pass, no graph substitution.

use tracing::debug;

use flatbake_scene::{
    BakeMode, BakeRequest, ChannelDescriptor, ImageRegistry, MaterialGraph, MeshObject,
    NativePass, NodeKind,
};

use crate::error::ExtractError;
use crate::extract::{allocate, defaulted, locate_roles, persist, BakeContext, Extraction, ExtractionOutcome};

/// Bakes `pass` into a fresh image for `descriptor`.
///
/// Only the temporary target node and the selection change, and both are
/// restored before returning.
pub fn bake_native(
    ctx: &mut BakeContext<'_>,
    mesh: &MeshObject,
    graph: &mut MaterialGraph,
    images: &mut ImageRegistry,
    descriptor: &ChannelDescriptor,
    pass: NativePass,
) -> Result<Extraction, ExtractError> {
    let image = allocate(ctx, mesh, images, descriptor);
    if let Err(reason) = locate_roles(graph) {
        return defaulted(ctx, mesh, images, descriptor, image, reason);
    }

    let selection = graph.selection();
    let target = graph.add_node(NodeKind::ImageTexture { image: Some(image) });
    let baked = match graph.select_only(target) {
        Ok(()) => ctx
            .engine
            .bake(BakeRequest {
                mode: BakeMode::Native(pass),
                mesh,
                material: &*graph,
                images: &mut *images,
            })
            .map_err(ExtractError::from),
        Err(e) => Err(e.into()),
    };
    graph.remove_node(target);
    graph.restore_selection(&selection);

    let stats = baked?;
    let path = persist(ctx, images, image)?;
    debug!(channel = %descriptor.channel, ?pass, covered = stats.covered_texels, "native bake done");
    Ok(Extraction {
        image,
        path,
        outcome: ExtractionOutcome::Baked {
            covered_texels: stats.covered_texels,
        },
    })
}
