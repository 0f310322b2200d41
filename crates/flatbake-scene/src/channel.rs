//! The fixed table of physical channels the pipeline extracts.
//!
//! Adding a channel is a data change: append a [`ChannelDescriptor`] to
//! [`CHANNELS`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::socket;
use crate::image::ColorSpace;
use crate::render::NativePass;

/// A physical material channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    BaseColor,
    Roughness,
    Metallic,
}

impl Channel {
    /// Returns the descriptor for this channel.
    pub fn descriptor(self) -> &'static ChannelDescriptor {
        match self {
            Channel::BaseColor => &CHANNELS[0],
            Channel::Roughness => &CHANNELS[1],
            Channel::Metallic => &CHANNELS[2],
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::BaseColor => write!(f, "base_color"),
            Channel::Roughness => write!(f, "roughness"),
            Channel::Metallic => write!(f, "metallic"),
        }
    }
}

/// Whether a channel carries display color or raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSemantics {
    Color,
    Data,
}

impl ChannelSemantics {
    /// Color space of images holding this channel.
    pub fn color_space(self) -> ColorSpace {
        match self {
            ChannelSemantics::Color => ColorSpace::Srgb,
            ChannelSemantics::Data => ColorSpace::NonColor,
        }
    }

    /// Fill value of a not-yet-baked image: light gray for color, mid gray for data.
    pub fn default_fill(self) -> [f32; 4] {
        let v = match self {
            ChannelSemantics::Color => 0.8,
            ChannelSemantics::Data => 0.5,
        };
        [v, v, v, 1.0]
    }
}

/// How a channel is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Reroute the channel signal through an emitter and bake emission.
    Substitution,
    /// Bake the engine's native pass for this property.
    Native(NativePass),
}

/// Immutable description of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// The channel.
    pub channel: Channel,
    /// Suffix of baked image names (`{object}_{suffix}`).
    pub suffix: &'static str,
    /// Hub input the channel reads from and is wired back into.
    pub hub_input: &'static str,
    /// Color or data semantics.
    pub semantics: ChannelSemantics,
    /// Capture strategy.
    pub strategy: ExtractionStrategy,
    /// Omitted in organic-surface mode.
    pub optional: bool,
}

/// Channels in extraction order.
pub const CHANNELS: [ChannelDescriptor; 3] = [
    ChannelDescriptor {
        channel: Channel::BaseColor,
        suffix: "diffuse",
        hub_input: socket::BASE_COLOR,
        semantics: ChannelSemantics::Color,
        strategy: ExtractionStrategy::Substitution,
        optional: false,
    },
    ChannelDescriptor {
        channel: Channel::Roughness,
        suffix: "roughness",
        hub_input: socket::ROUGHNESS,
        semantics: ChannelSemantics::Data,
        strategy: ExtractionStrategy::Native(NativePass::Roughness),
        optional: false,
    },
    ChannelDescriptor {
        channel: Channel::Metallic,
        suffix: "metallic",
        hub_input: socket::METALLIC,
        semantics: ChannelSemantics::Data,
        strategy: ExtractionStrategy::Substitution,
        optional: true,
    },
];

impl ChannelDescriptor {
    /// Name of the image baked for `object`.
    pub fn image_name(&self, object: &str) -> String {
        format!("{}_{}", object, self.suffix)
    }
}
