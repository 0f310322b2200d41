//! Inspect command implementation
//!
//! Imports a scene and reports, per mesh object, whether it has UVs, which
//! material sits in its first slot, and how each channel reaches the shader
//! hub. A channel fed straight by an image node survives FBX export as is;
//! anything else is what `convert` exists to flatten.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use flatbake_interchange::GltfImporter;
use flatbake_scene::{Channel, Scene, SceneImporter, CHANNELS};

use super::json_output::{InspectOutput, JsonError};

/// How a channel's hub input is driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChannelSource {
    /// Linked from another node.
    Linked {
        /// Display name of the upstream node kind
        node: String,
        /// Whether the upstream node is an image texture
        direct_image: bool,
    },
    /// Unlinked; the input's own value.
    Static { value: [f32; 4] },
    /// The graph has no unique shader hub.
    NoHub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: Channel,
    pub source: ChannelSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub name: String,
    pub use_nodes: bool,
    pub node_count: usize,
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub name: String,
    pub triangles: usize,
    pub has_uv: bool,
    pub material: Option<MaterialSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub objects: Vec<ObjectSummary>,
    pub images: usize,
}

/// Summarizes an imported scene.
pub fn summarize(scene: &Scene) -> SceneSummary {
    let objects = scene
        .objects
        .iter()
        .map(|object| ObjectSummary {
            name: object.name.clone(),
            triangles: object.triangles.len(),
            has_uv: object.has_uv(),
            material: object
                .primary_material()
                .and_then(|id| scene.material(id))
                .map(|material| MaterialSummary {
                    name: material.name.clone(),
                    use_nodes: material.use_nodes,
                    node_count: material.graph.node_count(),
                    channels: if material.use_nodes {
                        CHANNELS
                            .iter()
                            .map(|d| ChannelSummary {
                                channel: d.channel,
                                source: channel_source(&material.graph, d.hub_input),
                            })
                            .collect()
                    } else {
                        Vec::new()
                    },
                }),
        })
        .collect();

    SceneSummary {
        objects,
        images: scene.images.len(),
    }
}

fn channel_source(graph: &flatbake_scene::MaterialGraph, input: &str) -> ChannelSource {
    let Ok(hub) = graph.shader_hub() else {
        return ChannelSource::NoHub;
    };
    if let Some(link) = graph.link_into(hub, input) {
        let kind = graph.node(link.from_node).map(|n| *n.kind());
        return ChannelSource::Linked {
            node: kind.map(|k| k.type_name()).unwrap_or("?").to_string(),
            direct_image: kind.map(|k| k.is_image()).unwrap_or(false),
        };
    }
    match graph.input_value(hub, input) {
        Some(value) => ChannelSource::Static {
            value: value.to_color(),
        },
        None => ChannelSource::NoHub,
    }
}

/// Run the inspect command
///
/// # Arguments
/// * `input` - Path to the input scene
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 success, 1 error
pub fn run(input: &Path, json_output: bool) -> Result<ExitCode> {
    if json_output {
        run_json(input)
    } else {
        run_human(input)
    }
}

fn load(input: &Path) -> Result<SceneSummary> {
    let scene = GltfImporter::new()
        .import(input)
        .with_context(|| format!("Failed to import {}", input.display()))?;
    Ok(summarize(&scene))
}

fn run_human(input: &Path) -> Result<ExitCode> {
    println!("{} {}", "Inspecting:".cyan().bold(), input.display());
    let summary = load(input)?;

    println!(
        "{} {} objects, {} images",
        "Scene:".dimmed(),
        summary.objects.len(),
        summary.images
    );
    for object in &summary.objects {
        let uv = if object.has_uv {
            "uv".green()
        } else {
            "no uv".yellow()
        };
        println!(
            "\n{} ({} triangles, {})",
            object.name.bold(),
            object.triangles,
            uv
        );
        let Some(material) = &object.material else {
            println!("  {} no material", "-".yellow());
            continue;
        };
        if !material.use_nodes {
            println!("  {} {} (not node-based)", "-".yellow(), material.name);
            continue;
        }
        println!("  {} ({} nodes)", material.name, material.node_count);
        for channel in &material.channels {
            let source = match &channel.source {
                ChannelSource::Linked {
                    node,
                    direct_image: true,
                } => format!("{} (direct)", node).green(),
                ChannelSource::Linked { node, .. } => format!("via {}", node).yellow(),
                ChannelSource::Static { value } => {
                    format!("[{:.3}, {:.3}, {:.3}]", value[0], value[1], value[2]).normal()
                }
                ChannelSource::NoHub => "no shader hub".red(),
            };
            println!("    {:<12} {}", channel.channel.to_string(), source);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_json(input: &Path) -> Result<ExitCode> {
    let (output, code) = match load(input) {
        Ok(scene) => (
            InspectOutput {
                success: true,
                scene: Some(scene),
                error: None,
            },
            ExitCode::SUCCESS,
        ),
        Err(e) => (
            InspectOutput {
                success: false,
                scene: None,
                error: Some(JsonError::from_anyhow(&e)),
            },
            ExitCode::from(1),
        ),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbake_scene::{
        socket, ColorSpace, Material, MaterialGraph, MeshObject, NodeKind, SocketValue,
    };
    use pretty_assertions::assert_eq;

    fn triangle(name: &str) -> MeshObject {
        MeshObject::new(
            name,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_summary_reports_wiring() {
        let mut scene = Scene::new();
        let packed = scene
            .images
            .create("orm", 2, 2, ColorSpace::NonColor, [0.0, 0.5, 1.0, 1.0]);
        let base = scene
            .images
            .create("albedo", 2, 2, ColorSpace::Srgb, [1.0; 4]);

        let mut graph = MaterialGraph::new();
        let hub = graph.add_node(NodeKind::PrincipledBsdf);
        let out = graph.add_node(NodeKind::MaterialOutput);
        graph.connect(hub, socket::BSDF, out, socket::SURFACE).unwrap();
        let albedo = graph.add_node(NodeKind::ImageTexture { image: Some(base) });
        graph.connect(albedo, socket::COLOR, hub, socket::BASE_COLOR).unwrap();
        let tex = graph.add_node(NodeKind::ImageTexture { image: Some(packed) });
        let split = graph.add_node(NodeKind::SeparateColor);
        graph.connect(tex, socket::COLOR, split, socket::COLOR).unwrap();
        graph.connect(split, socket::BLUE, hub, socket::METALLIC).unwrap();
        graph
            .set_input_value(hub, socket::ROUGHNESS, SocketValue::Float(0.25))
            .unwrap();
        let id = scene.add_material(Material::with_graph("Metal", graph));
        scene.objects.push(triangle("Helmet").with_material_slot(Some(id)));
        scene.objects.push(triangle("Bare"));

        let summary = summarize(&scene);

        assert_eq!(summary.images, 2);
        assert_eq!(summary.objects[1].material, None);
        let material = summary.objects[0].material.as_ref().unwrap();
        assert_eq!(material.node_count, 6);
        assert_eq!(
            material.channels,
            vec![
                ChannelSummary {
                    channel: Channel::BaseColor,
                    source: ChannelSource::Linked {
                        node: "Image Texture".to_string(),
                        direct_image: true,
                    },
                },
                ChannelSummary {
                    channel: Channel::Roughness,
                    source: ChannelSource::Static {
                        value: [0.25, 0.25, 0.25, 1.0]
                    },
                },
                ChannelSummary {
                    channel: Channel::Metallic,
                    source: ChannelSource::Linked {
                        node: "Separate Color".to_string(),
                        direct_image: false,
                    },
                },
            ]
        );
    }

    #[test]
    fn test_legacy_material_has_no_channels() {
        let mut scene = Scene::new();
        let id = scene.add_material(Material::legacy("Old"));
        scene.objects.push(triangle("A").with_material_slot(Some(id)));

        let summary = summarize(&scene);
        let material = summary.objects[0].material.as_ref().unwrap();
        assert!(!material.use_nodes);
        assert!(material.channels.is_empty());
    }

    #[test]
    fn test_hubless_graph() {
        let graph = MaterialGraph::new();
        assert_eq!(channel_source(&graph, socket::BASE_COLOR), ChannelSource::NoHub);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load(Path::new("/no/such/scene.glb")).is_err());
    }
}
