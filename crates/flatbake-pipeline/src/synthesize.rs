//! Clean material synthesis.

use std::collections::BTreeMap;

use flatbake_scene::{
    socket, Channel, GraphError, ImageId, ImageRegistry, Material, MaterialGraph, NodeKind,
};

/// Name of the clean material built for `object`.
pub fn clean_material_name(object: &str) -> String {
    format!("{}_baked", object)
}

/// Builds a material whose only texture wiring is image → hub input.
///
/// Each image's color-space flag is set from its channel's semantics. Channels
/// absent from `images` leave their hub input at its default.
pub fn synthesize(
    name: impl Into<String>,
    channels: &BTreeMap<Channel, ImageId>,
    registry: &mut ImageRegistry,
) -> Result<Material, GraphError> {
    let mut graph = MaterialGraph::new();
    let hub = graph.add_node(NodeKind::PrincipledBsdf);
    let output = graph.add_node(NodeKind::MaterialOutput);
    graph.connect(hub, socket::BSDF, output, socket::SURFACE)?;

    for (&channel, &image) in channels {
        let descriptor = channel.descriptor();
        if let Some(img) = registry.get_mut(image) {
            img.color_space = descriptor.semantics.color_space();
        }
        let node = graph.add_node(NodeKind::ImageTexture { image: Some(image) });
        graph.connect(node, socket::COLOR, hub, descriptor.hub_input)?;
    }

    Ok(Material::with_graph(name, graph))
}
