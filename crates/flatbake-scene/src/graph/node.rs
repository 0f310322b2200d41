//! Shading node kinds, their socket layouts and socket values.

use crate::image::ImageId;

use super::Role;

/// Socket names used by the built-in node kinds.
pub mod socket {
    // Principled BSDF inputs
    pub const BASE_COLOR: &str = "Base Color";
    pub const METALLIC: &str = "Metallic";
    pub const ROUGHNESS: &str = "Roughness";
    pub const ALPHA: &str = "Alpha";
    pub const EMISSION_COLOR: &str = "Emission Color";
    pub const EMISSION_STRENGTH: &str = "Emission Strength";

    // Shader outputs and the material output input
    pub const BSDF: &str = "BSDF";
    pub const EMISSION: &str = "Emission";
    pub const SURFACE: &str = "Surface";

    // Emission inputs
    pub const COLOR: &str = "Color";
    pub const STRENGTH: &str = "Strength";

    // Separate / combine color
    pub const RED: &str = "Red";
    pub const GREEN: &str = "Green";
    pub const BLUE: &str = "Blue";

    // Mix color
    pub const FACTOR: &str = "Factor";
    pub const A: &str = "A";
    pub const B: &str = "B";
    pub const RESULT: &str = "Result";

    // Math and value
    pub const VALUE: &str = "Value";
}

/// Static value carried by an unlinked input socket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SocketValue {
    /// Scalar value.
    Float(f32),
    /// RGBA color (linear).
    Color([f32; 4]),
    /// 3D vector.
    Vector([f32; 3]),
    /// Shader closure; has no static value.
    Shader,
}

impl SocketValue {
    /// Converts the value to an RGBA color, broadcasting scalars to RGB.
    pub fn to_color(self) -> [f32; 4] {
        match self {
            SocketValue::Float(v) => [v, v, v, 1.0],
            SocketValue::Color(c) => c,
            SocketValue::Vector(v) => [v[0], v[1], v[2], 1.0],
            SocketValue::Shader => [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Converts the value to a scalar.
    ///
    /// Colors reduce to their Rec.709 luminance, vectors to their average.
    pub fn to_float(self) -> f32 {
        match self {
            SocketValue::Float(v) => v,
            SocketValue::Color(c) => luminance(c),
            SocketValue::Vector(v) => (v[0] + v[1] + v[2]) / 3.0,
            SocketValue::Shader => 0.0,
        }
    }
}

/// Rec.709 luminance of a linear color.
pub fn luminance(c: [f32; 4]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

/// Blend mode of a [`NodeKind::MixColor`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixBlend {
    /// Linear interpolation from A to B by factor.
    Mix,
    /// A multiplied by B, blended by factor.
    Multiply,
    /// A plus B, blended by factor.
    Add,
}

/// Operation of a [`NodeKind::Math`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Minimum,
    Maximum,
    Power,
}

impl MathOp {
    /// Applies the operation.
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
            MathOp::Minimum => a.min(b),
            MathOp::Maximum => a.max(b),
            MathOp::Power => {
                if a < 0.0 && b.fract() != 0.0 {
                    0.0
                } else {
                    a.powf(b)
                }
            }
        }
    }
}

/// Kind of a shading node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// The physically based shader hub.
    PrincipledBsdf,
    /// The material output node.
    MaterialOutput,
    /// Non-physical emitter shader.
    Emission,
    /// Image sampled at the active UV parametrization.
    ImageTexture { image: Option<ImageId> },
    /// Splits a color into its components.
    SeparateColor,
    /// Builds a color from three components.
    CombineColor,
    /// Blends two colors.
    MixColor { blend: MixBlend },
    /// Scalar math.
    Math { op: MathOp },
    /// Constant scalar.
    Value { value: f32 },
    /// Constant color.
    Rgb { color: [f32; 4] },
}

/// An input socket and its static value.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Socket name.
    pub name: &'static str,
    /// Value used while the socket is unlinked.
    pub value: SocketValue,
}

impl Input {
    const fn new(name: &'static str, value: SocketValue) -> Self {
        Self { name, value }
    }
}

impl NodeKind {
    /// Returns a display name for this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::PrincipledBsdf => "Principled BSDF",
            NodeKind::MaterialOutput => "Material Output",
            NodeKind::Emission => "Emission",
            NodeKind::ImageTexture { .. } => "Image Texture",
            NodeKind::SeparateColor => "Separate Color",
            NodeKind::CombineColor => "Combine Color",
            NodeKind::MixColor { .. } => "Mix Color",
            NodeKind::Math { .. } => "Math",
            NodeKind::Value { .. } => "Value",
            NodeKind::Rgb { .. } => "RGB",
        }
    }

    /// Returns the input sockets of this kind with their default values.
    pub fn default_inputs(&self) -> Vec<Input> {
        use SocketValue::*;
        match self {
            NodeKind::PrincipledBsdf => vec![
                Input::new(socket::BASE_COLOR, Color([0.8, 0.8, 0.8, 1.0])),
                Input::new(socket::METALLIC, Float(0.0)),
                Input::new(socket::ROUGHNESS, Float(0.5)),
                Input::new(socket::ALPHA, Float(1.0)),
                Input::new(socket::EMISSION_COLOR, Color([1.0, 1.0, 1.0, 1.0])),
                Input::new(socket::EMISSION_STRENGTH, Float(0.0)),
            ],
            NodeKind::MaterialOutput => vec![Input::new(socket::SURFACE, Shader)],
            NodeKind::Emission => vec![
                Input::new(socket::COLOR, Color([1.0, 1.0, 1.0, 1.0])),
                Input::new(socket::STRENGTH, Float(1.0)),
            ],
            NodeKind::ImageTexture { .. } => Vec::new(),
            NodeKind::SeparateColor => {
                vec![Input::new(socket::COLOR, Color([0.8, 0.8, 0.8, 1.0]))]
            }
            NodeKind::CombineColor => vec![
                Input::new(socket::RED, Float(0.0)),
                Input::new(socket::GREEN, Float(0.0)),
                Input::new(socket::BLUE, Float(0.0)),
            ],
            NodeKind::MixColor { .. } => vec![
                Input::new(socket::FACTOR, Float(0.5)),
                Input::new(socket::A, Color([0.5, 0.5, 0.5, 1.0])),
                Input::new(socket::B, Color([0.5, 0.5, 0.5, 1.0])),
            ],
            NodeKind::Math { .. } => vec![
                Input::new(socket::A, Float(0.5)),
                Input::new(socket::B, Float(0.5)),
            ],
            NodeKind::Value { .. } | NodeKind::Rgb { .. } => Vec::new(),
        }
    }

    /// Returns the output socket names of this kind.
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            NodeKind::PrincipledBsdf => &[socket::BSDF],
            NodeKind::MaterialOutput => &[],
            NodeKind::Emission => &[socket::EMISSION],
            NodeKind::ImageTexture { .. } => &[socket::COLOR, socket::ALPHA],
            NodeKind::SeparateColor => &[socket::RED, socket::GREEN, socket::BLUE],
            NodeKind::CombineColor => &[socket::COLOR],
            NodeKind::MixColor { .. } => &[socket::RESULT],
            NodeKind::Math { .. } | NodeKind::Value { .. } => &[socket::VALUE],
            NodeKind::Rgb { .. } => &[socket::COLOR],
        }
    }

    /// Returns the graph role this kind plays, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            NodeKind::PrincipledBsdf => Some(Role::ShaderHub),
            NodeKind::MaterialOutput => Some(Role::Output),
            _ => None,
        }
    }

    /// Returns the image carried by an image node.
    pub fn image(&self) -> Option<ImageId> {
        match self {
            NodeKind::ImageTexture { image } => *image,
            _ => None,
        }
    }

    /// Returns true for image-carrying nodes.
    pub fn is_image(&self) -> bool {
        matches!(self, NodeKind::ImageTexture { .. })
    }
}

/// A shading node: its kind, input values and selection flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    inputs: Vec<Input>,
    selected: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            inputs: kind.default_inputs(),
            kind,
            selected: false,
        }
    }

    /// Node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// All input sockets in declaration order.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Looks up an input socket by name.
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut Input> {
        self.inputs.iter_mut().find(|i| i.name == name)
    }

    /// Resolves an output socket name to its canonical static name.
    pub fn output_socket(&self, name: &str) -> Option<&'static str> {
        self.kind.outputs().iter().copied().find(|o| *o == name)
    }

    /// Resolves an input socket name to its canonical static name.
    pub fn input_socket(&self, name: &str) -> Option<&'static str> {
        self.input(name).map(|i| i.name)
    }

    /// Whether the node is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}
