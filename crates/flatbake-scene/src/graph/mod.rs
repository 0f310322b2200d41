//! Material node graphs.
//!
//! A [`MaterialGraph`] owns its nodes and links. Nodes and links are
//! addressed by handles that are allocated monotonically and never reused, so
//! a handle recorded before a mutation still names the same node afterwards.
//!
//! Every input socket accepts at most one link: connecting into an input that
//! is already linked replaces the previous link. This keeps the material
//! output's surface input single-sourced at all times.

mod node;

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BakeTargetError, GraphError, RoleLookupError};
use crate::image::ImageId;

pub use node::{luminance, socket, Input, MathOp, MixBlend, Node, NodeKind, SocketValue};

/// Handle of a node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw handle value.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a link within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u32);

/// A directed connection from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub from_node: NodeId,
    pub from_socket: &'static str,
    pub to_node: NodeId,
    pub to_socket: &'static str,
}

/// Structural role a node plays in a well-formed material graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The single physically based shader every channel converges on.
    ShaderHub,
    /// The material output consuming the hub through its surface input.
    Output,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::ShaderHub => write!(f, "shader hub"),
            Role::Output => write!(f, "material output"),
        }
    }
}

/// Node selection state of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    selected: Vec<NodeId>,
    active: Option<NodeId>,
}

/// Full structural state of a graph, for equality checks across mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    nodes: Vec<(NodeId, Node)>,
    links: Vec<(LinkId, Link)>,
    active: Option<NodeId>,
}

/// A directed graph of shading nodes and links.
#[derive(Debug, Clone, Default)]
pub struct MaterialGraph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    active: Option<NodeId>,
    next_node: u32,
    next_link: u32,
}

impl MaterialGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with default input values and returns its handle.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(kind));
        id
    }

    /// Removes a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.links
            .retain(|_, link| link.from_node != id && link.to_node != id);
        if self.active == Some(id) {
            self.active = None;
        }
        Some(node)
    }

    /// Returns a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Iterates nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connects an output socket to an input socket.
    ///
    /// Any link already feeding the input is replaced.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> Result<LinkId, GraphError> {
        let link = self.resolve_link(from, from_socket, to, to_socket)?;
        self.disconnect(to, link.to_socket);
        let id = LinkId(self.next_link);
        self.next_link += 1;
        self.links.insert(id, link);
        Ok(id)
    }

    /// Removes the link feeding an input, returning it with its handle.
    pub fn disconnect(&mut self, to: NodeId, to_socket: &str) -> Option<(LinkId, Link)> {
        let id = self.link_entry_into(to, to_socket).map(|(id, _)| id)?;
        self.links.remove(&id).map(|link| (id, link))
    }

    /// Re-inserts a previously removed link under its original handle.
    ///
    /// Any link currently feeding the same input is replaced.
    pub fn restore_link(&mut self, id: LinkId, link: Link) -> Result<(), GraphError> {
        let link = self.resolve_link(link.from_node, link.from_socket, link.to_node, link.to_socket)?;
        self.disconnect(link.to_node, link.to_socket);
        self.links.insert(id, link);
        self.next_link = self.next_link.max(id.0 + 1);
        Ok(())
    }

    fn resolve_link(
        &self,
        from: NodeId,
        from_socket: &str,
        to: NodeId,
        to_socket: &str,
    ) -> Result<Link, GraphError> {
        if from == to {
            return Err(GraphError::SelfLink(from));
        }
        let from_node = self.nodes.get(&from).ok_or(GraphError::UnknownNode(from))?;
        let to_node = self.nodes.get(&to).ok_or(GraphError::UnknownNode(to))?;
        let from_socket = from_node
            .output_socket(from_socket)
            .ok_or_else(|| GraphError::UnknownOutput {
                node: from,
                socket: from_socket.to_string(),
            })?;
        let to_socket = to_node
            .input_socket(to_socket)
            .ok_or_else(|| GraphError::UnknownInput {
                node: to,
                socket: to_socket.to_string(),
            })?;
        Ok(Link {
            from_node: from,
            from_socket,
            to_node: to,
            to_socket,
        })
    }

    /// Returns the link feeding an input, if any.
    pub fn link_into(&self, to: NodeId, to_socket: &str) -> Option<&Link> {
        self.link_entry_into(to, to_socket).map(|(_, link)| link)
    }

    /// Returns the link feeding an input together with its handle.
    pub fn link_entry_into(&self, to: NodeId, to_socket: &str) -> Option<(LinkId, &Link)> {
        self.links
            .iter()
            .find(|(_, link)| link.to_node == to && link.to_socket == to_socket)
            .map(|(id, link)| (*id, link))
    }

    /// Whether an input is driven by a link.
    pub fn is_linked(&self, to: NodeId, to_socket: &str) -> bool {
        self.link_into(to, to_socket).is_some()
    }

    /// Current links in handle order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns the static value of an input socket.
    pub fn input_value(&self, node: NodeId, socket: &str) -> Option<SocketValue> {
        self.nodes.get(&node)?.input(socket).map(|i| i.value)
    }

    /// Sets the static value of an input socket.
    pub fn set_input_value(
        &mut self,
        node: NodeId,
        socket: &str,
        value: SocketValue,
    ) -> Result<(), GraphError> {
        let n = self.nodes.get_mut(&node).ok_or(GraphError::UnknownNode(node))?;
        let input = n.input_mut(socket).ok_or_else(|| GraphError::UnknownInput {
            node,
            socket: socket.to_string(),
        })?;
        input.value = value;
        Ok(())
    }

    /// Returns the unique physically based shader hub.
    pub fn shader_hub(&self) -> Result<NodeId, RoleLookupError> {
        self.find_role(Role::ShaderHub)
    }

    /// Returns the unique material output node.
    pub fn output(&self) -> Result<NodeId, RoleLookupError> {
        self.find_role(Role::Output)
    }

    /// Returns the unique node playing `role`.
    pub fn find_role(&self, role: Role) -> Result<NodeId, RoleLookupError> {
        let mut found = self
            .nodes
            .iter()
            .filter(|(_, node)| node.kind().role() == Some(role))
            .map(|(id, _)| *id);
        match (found.next(), found.count()) {
            (None, _) => Err(RoleLookupError::Missing(role)),
            (Some(id), 0) => Ok(id),
            (Some(_), rest) => Err(RoleLookupError::Ambiguous {
                role,
                count: rest + 1,
            }),
        }
    }

    /// Deselects every node, then selects `id` and makes it active.
    pub fn select_only(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        for (node_id, node) in self.nodes.iter_mut() {
            node.set_selected(*node_id == id);
        }
        self.active = Some(id);
        Ok(())
    }

    /// Sets the selection flag of one node.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.set_selected(selected);
        Ok(())
    }

    /// The active node, if any.
    pub fn active_node(&self) -> Option<NodeId> {
        self.active
    }

    /// Records which nodes are selected and which is active.
    pub fn selection(&self) -> SelectionState {
        SelectionState {
            selected: self
                .nodes
                .iter()
                .filter(|(_, node)| node.is_selected())
                .map(|(id, _)| *id)
                .collect(),
            active: self.active,
        }
    }

    /// Restores a recorded selection. Nodes removed since are ignored.
    pub fn restore_selection(&mut self, state: &SelectionState) {
        for (id, node) in self.nodes.iter_mut() {
            node.set_selected(state.selected.contains(id));
        }
        self.active = state.active.filter(|id| self.nodes.contains_key(id));
    }

    /// Resolves the image node designated as bake target.
    ///
    /// Exactly one image node may be selected.
    pub fn bake_target(&self) -> Result<(NodeId, ImageId), BakeTargetError> {
        let selected: Vec<(NodeId, &Node)> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.kind().is_image() && node.is_selected())
            .map(|(id, node)| (*id, node))
            .collect();
        match selected.as_slice() {
            [] => Err(BakeTargetError::NoBakeTarget),
            [(id, node)] => node
                .kind()
                .image()
                .map(|image| (*id, image))
                .ok_or(BakeTargetError::TargetImageMissing(*id)),
            many => Err(BakeTargetError::AmbiguousBakeTarget { count: many.len() }),
        }
    }

    /// Captures the full structural state of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.iter().map(|(id, n)| (*id, n.clone())).collect(),
            links: self.links.iter().map(|(id, l)| (*id, *l)).collect(),
            active: self.active,
        }
    }
}

/// A material: either a node graph or a legacy non-node material.
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Whether the material is shaded by its node graph.
    pub use_nodes: bool,
    /// The shading graph. Empty for legacy materials.
    pub graph: MaterialGraph,
}

impl Material {
    /// Creates a node-based material.
    pub fn with_graph(name: impl Into<String>, graph: MaterialGraph) -> Self {
        Self {
            name: name.into(),
            use_nodes: true,
            graph,
        }
    }

    /// Creates a material that does not use the node-graph shading system.
    pub fn legacy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_nodes: false,
            graph: MaterialGraph::new(),
        }
    }
}
