//! In-memory FBX node tree.

/// A typed FBX property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// `C`: boolean.
    Bool(bool),
    /// `I`: 32-bit integer.
    I32(i32),
    /// `L`: 64-bit integer.
    I64(i64),
    /// `D`: 64-bit float.
    F64(f64),
    /// `S`: string.
    String(String),
    /// `R`: raw bytes.
    Raw(Vec<u8>),
    /// `i`: 32-bit integer array.
    I32Array(Vec<i32>),
    /// `d`: 64-bit float array.
    F64Array(Vec<f64>),
}

impl Property {
    /// Type code written before the value.
    pub fn type_code(&self) -> u8 {
        match self {
            Property::Bool(_) => b'C',
            Property::I32(_) => b'I',
            Property::I64(_) => b'L',
            Property::F64(_) => b'D',
            Property::String(_) => b'S',
            Property::Raw(_) => b'R',
            Property::I32Array(_) => b'i',
            Property::F64Array(_) => b'd',
        }
    }

    /// Encodes a namespaced object name, `Class::name` in FBX notation.
    pub fn object_name(name: &str, class: &str) -> Self {
        Property::String(format!("{name}\u{0}\u{1}{class}"))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Property::I32(v) => Some(v as i64),
            Property::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Property::F64(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::String(s.to_string())
    }
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        Property::String(s)
    }
}

impl From<i32> for Property {
    fn from(v: i32) -> Self {
        Property::I32(v)
    }
}

impl From<i64> for Property {
    fn from(v: i64) -> Self {
        Property::I64(v)
    }
}

impl From<f64> for Property {
    fn from(v: f64) -> Self {
        Property::F64(v)
    }
}

/// One FBX node record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a node with no properties and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a property.
    pub fn prop(mut self, value: impl Into<Property>) -> Self {
        self.properties.push(value.into());
        self
    }

    /// Appends a child node.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several child nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Shorthand for a node holding a single value.
    pub fn leaf(name: impl Into<String>, value: impl Into<Property>) -> Self {
        Self::new(name).prop(value)
    }

    /// First child with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child with the given name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// A `P` entry of a `Properties70` block.
pub(crate) fn p70(name: &str, kind: &str, label: &str, values: Vec<Property>) -> Node {
    let mut node = Node::new("P").prop(name).prop(kind).prop(label).prop("A");
    node.properties.extend(values);
    node
}

pub(crate) fn p70_int(name: &str, value: i32) -> Node {
    p70(name, "int", "Integer", vec![Property::I32(value)])
}

pub(crate) fn p70_double(name: &str, value: f64) -> Node {
    p70(name, "double", "Number", vec![Property::F64(value)])
}

pub(crate) fn p70_number(name: &str, value: f64) -> Node {
    p70(name, "Number", "", vec![Property::F64(value)])
}

pub(crate) fn p70_color(name: &str, rgb: [f64; 3]) -> Node {
    p70(
        name,
        "Color",
        "",
        rgb.iter().map(|c| Property::F64(*c)).collect(),
    )
}

/// A complete FBX document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// File format version, e.g. 7400.
    pub version: u32,
    /// Top-level nodes.
    pub nodes: Vec<Node>,
}

impl Document {
    /// First top-level node with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
