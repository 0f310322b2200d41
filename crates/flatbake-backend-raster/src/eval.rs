//! Shading graph evaluation at a single UV coordinate.

use std::collections::{HashMap, HashSet};

use flatbake_scene::graph::{socket, MixBlend, NodeKind, SocketValue};
use flatbake_scene::{BakeError, BakeMode, ImageRegistry, MaterialGraph, NativePass, NodeId};

/// Color an image node yields when it has no image.
const MISSING_IMAGE: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

/// Evaluates one material graph against an image registry.
pub(crate) struct Evaluator<'a> {
    graph: &'a MaterialGraph,
    images: &'a ImageRegistry,
    /// (destination node, input) -> (source node, output)
    links: HashMap<(NodeId, &'static str), (NodeId, &'static str)>,
    surface: NodeId,
}

impl<'a> Evaluator<'a> {
    /// Resolves the surface shader and checks that everything it depends on
    /// is acyclic.
    pub fn new(graph: &'a MaterialGraph, images: &'a ImageRegistry) -> Result<Self, BakeError> {
        let links = graph
            .links()
            .map(|(_, l)| ((l.to_node, l.to_socket), (l.from_node, l.from_socket)))
            .collect();

        let output = graph.output()?;
        let surface = graph
            .link_into(output, socket::SURFACE)
            .map(|l| l.from_node)
            .ok_or(BakeError::NoSurfaceShader)?;

        let evaluator = Self {
            graph,
            images,
            links,
            surface,
        };
        evaluator.check_acyclic(surface, &mut HashSet::new(), &mut HashSet::new())?;
        Ok(evaluator)
    }

    fn check_acyclic(
        &self,
        node: NodeId,
        visiting: &mut HashSet<NodeId>,
        done: &mut HashSet<NodeId>,
    ) -> Result<(), BakeError> {
        if done.contains(&node) {
            return Ok(());
        }
        if !visiting.insert(node) {
            return Err(BakeError::GraphCycle(node));
        }
        let upstream: Vec<NodeId> = self
            .links
            .iter()
            .filter(|((to, _), _)| *to == node)
            .map(|(_, (from, _))| *from)
            .collect();
        for from in upstream {
            self.check_acyclic(from, visiting, done)?;
        }
        visiting.remove(&node);
        done.insert(node);
        Ok(())
    }

    /// Captures the value `mode` records at `uv`.
    pub fn capture(&self, mode: BakeMode, uv: [f32; 2]) -> [f32; 4] {
        let Some(shader) = self.graph.node(self.surface) else {
            return [0.0, 0.0, 0.0, 1.0];
        };
        let rgb = match (mode, shader.kind()) {
            (BakeMode::Emit, NodeKind::Emission) => {
                let color = self.input(self.surface, socket::COLOR, uv).to_color();
                let strength = self.input(self.surface, socket::STRENGTH, uv).to_float();
                scale(color, strength)
            }
            (BakeMode::Emit, NodeKind::PrincipledBsdf) => {
                let color = self.input(self.surface, socket::EMISSION_COLOR, uv).to_color();
                let strength = self
                    .input(self.surface, socket::EMISSION_STRENGTH, uv)
                    .to_float();
                scale(color, strength)
            }
            (BakeMode::Native(NativePass::Roughness), NodeKind::PrincipledBsdf) => {
                let r = self.input(self.surface, socket::ROUGHNESS, uv).to_float();
                [r, r, r, 1.0]
            }
            // Surfaces without a microfacet lobe are fully rough.
            (BakeMode::Native(NativePass::Roughness), _) => [1.0, 1.0, 1.0, 1.0],
            (BakeMode::Native(NativePass::Diffuse), NodeKind::PrincipledBsdf) => {
                let color = self.input(self.surface, socket::BASE_COLOR, uv).to_color();
                let metallic = self
                    .input(self.surface, socket::METALLIC, uv)
                    .to_float()
                    .clamp(0.0, 1.0);
                scale(color, 1.0 - metallic)
            }
            _ => [0.0, 0.0, 0.0, 1.0],
        };
        [rgb[0], rgb[1], rgb[2], 1.0]
    }

    fn input(&self, node: NodeId, input: &'static str, uv: [f32; 2]) -> SocketValue {
        match self.links.get(&(node, input)) {
            Some(&(from, output)) => self.output(from, output, uv),
            None => self
                .graph
                .input_value(node, input)
                .unwrap_or(SocketValue::Float(0.0)),
        }
    }

    fn output(&self, node: NodeId, output: &'static str, uv: [f32; 2]) -> SocketValue {
        let Some(n) = self.graph.node(node) else {
            return SocketValue::Float(0.0);
        };
        match *n.kind() {
            NodeKind::ImageTexture { image } => {
                let texel = image
                    .and_then(|id| self.images.get(id))
                    .map(|img| img.sample_bilinear(uv[0], uv[1]))
                    .unwrap_or(MISSING_IMAGE);
                if output == socket::ALPHA {
                    SocketValue::Float(texel[3])
                } else {
                    SocketValue::Color([texel[0], texel[1], texel[2], 1.0])
                }
            }
            NodeKind::SeparateColor => {
                let c = self.input(node, socket::COLOR, uv).to_color();
                let v = match output {
                    socket::RED => c[0],
                    socket::GREEN => c[1],
                    _ => c[2],
                };
                SocketValue::Float(v)
            }
            NodeKind::CombineColor => SocketValue::Color([
                self.input(node, socket::RED, uv).to_float(),
                self.input(node, socket::GREEN, uv).to_float(),
                self.input(node, socket::BLUE, uv).to_float(),
                1.0,
            ]),
            NodeKind::MixColor { blend } => {
                let fac = self.input(node, socket::FACTOR, uv).to_float().clamp(0.0, 1.0);
                let a = self.input(node, socket::A, uv).to_color();
                let b = self.input(node, socket::B, uv).to_color();
                let mut out = a;
                for i in 0..3 {
                    out[i] = match blend {
                        MixBlend::Mix => a[i] + (b[i] - a[i]) * fac,
                        MixBlend::Multiply => a[i] * (1.0 - fac) + a[i] * b[i] * fac,
                        MixBlend::Add => a[i] + b[i] * fac,
                    };
                }
                SocketValue::Color(out)
            }
            NodeKind::Math { op } => {
                let a = self.input(node, socket::A, uv).to_float();
                let b = self.input(node, socket::B, uv).to_float();
                SocketValue::Float(op.apply(a, b))
            }
            NodeKind::Value { value } => SocketValue::Float(value),
            NodeKind::Rgb { color } => SocketValue::Color(color),
            NodeKind::PrincipledBsdf | NodeKind::Emission | NodeKind::MaterialOutput => {
                SocketValue::Shader
            }
        }
    }
}

fn scale(c: [f32; 4], s: f32) -> [f32; 4] {
    [c[0] * s, c[1] * s, c[2] * s, c[3]]
}
