//! Run report.
//!
//! Every recoverable condition ends up here instead of in an error.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use flatbake_scene::{Channel, Role, RoleLookupError};

/// Why a mesh object was left unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No UV parametrization exists and none could be synthesized.
    NoUv,
    /// The object has no material slot or the slot is empty.
    NoMaterial,
    /// The material does not use the node-graph shading system.
    NotNodeBased,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoUv => write!(f, "no UV map"),
            SkipReason::NoMaterial => write!(f, "no material"),
            SkipReason::NotNodeBased => write!(f, "material does not use nodes"),
        }
    }
}

/// Why a channel was filled with its default instead of baked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelUnavailable {
    /// No unique shader hub node.
    MissingHubNode,
    /// No unique material output node.
    MissingOutputNode,
}

impl ChannelUnavailable {
    /// Maps a failed role lookup. An ambiguous role is as unusable as a missing one.
    pub fn from_lookup(err: RoleLookupError) -> Self {
        let role = match err {
            RoleLookupError::Missing(role) => role,
            RoleLookupError::Ambiguous { role, .. } => role,
        };
        match role {
            Role::ShaderHub => ChannelUnavailable::MissingHubNode,
            Role::Output => ChannelUnavailable::MissingOutputNode,
        }
    }
}

impl fmt::Display for ChannelUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelUnavailable::MissingHubNode => write!(f, "missing shader hub"),
            ChannelUnavailable::MissingOutputNode => write!(f, "missing material output"),
        }
    }
}

/// Result of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Captured from the source material.
    Baked,
    /// Filled with the channel default.
    Defaulted(ChannelUnavailable),
    /// The bake or persist step failed; the channel is not in the clean material.
    Failed { message: String },
}

/// One channel of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: Channel,
    pub status: ChannelStatus,
    /// Persisted image, absent for failed channels.
    pub image_path: Option<PathBuf>,
}

/// What happened to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// The object now uses a clean material.
    Converted {
        material: String,
        channels: Vec<ChannelReport>,
    },
    /// The object kept its original state.
    Skipped(SkipReason),
}

/// One mesh object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub name: String,
    /// A UV map was generated for this object.
    pub uv_synthesized: bool,
    pub outcome: ObjectOutcome,
}

impl ObjectReport {
    /// Returns true if the object was converted.
    pub fn is_converted(&self) -> bool {
        matches!(self.outcome, ObjectOutcome::Converted { .. })
    }

    /// Report for one channel, if it was attempted.
    pub fn channel(&self, channel: Channel) -> Option<&ChannelReport> {
        match &self.outcome {
            ObjectOutcome::Converted { channels, .. } => {
                channels.iter().find(|c| c.channel == channel)
            }
            ObjectOutcome::Skipped(_) => None,
        }
    }
}

/// Summary of a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub objects: Vec<ObjectReport>,
    /// Size of the exported file.
    pub output_bytes: u64,
}

impl ConversionReport {
    /// Number of converted objects.
    pub fn converted_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_converted()).count()
    }

    /// Number of skipped objects.
    pub fn skipped_count(&self) -> usize {
        self.objects.len() - self.converted_count()
    }

    /// Looks up an object by name.
    pub fn object(&self, name: &str) -> Option<&ObjectReport> {
        self.objects.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ambiguous_role_counts_as_missing() {
        assert_eq!(
            ChannelUnavailable::from_lookup(RoleLookupError::Ambiguous {
                role: Role::Output,
                count: 2
            }),
            ChannelUnavailable::MissingOutputNode
        );
        assert_eq!(
            ChannelUnavailable::from_lookup(RoleLookupError::Missing(Role::ShaderHub)),
            ChannelUnavailable::MissingHubNode
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = ObjectReport {
            name: "Cube".to_string(),
            uv_synthesized: false,
            outcome: ObjectOutcome::Converted {
                material: "Cube_baked".to_string(),
                channels: vec![ChannelReport {
                    channel: Channel::Metallic,
                    status: ChannelStatus::Defaulted(ChannelUnavailable::MissingHubNode),
                    image_path: Some(PathBuf::from("/tmp/Cube_metallic.png")),
                }],
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["outcome"]["converted"]["channels"][0]["status"],
            serde_json::json!({"defaulted": "missing_hub_node"})
        );
        assert!(report.channel(Channel::Metallic).is_some());
        assert!(report.channel(Channel::Roughness).is_none());
    }

    #[test]
    fn test_counts() {
        let report = ConversionReport {
            input: PathBuf::from("in.glb"),
            output: PathBuf::from("out.fbx"),
            objects: vec![
                ObjectReport {
                    name: "A".to_string(),
                    uv_synthesized: true,
                    outcome: ObjectOutcome::Skipped(SkipReason::NoMaterial),
                },
                ObjectReport {
                    name: "B".to_string(),
                    uv_synthesized: false,
                    outcome: ObjectOutcome::Converted {
                        material: "B_baked".to_string(),
                        channels: vec![],
                    },
                },
            ],
            output_bytes: 10,
        };
        assert_eq!(report.converted_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.object("A").map(|o| o.is_converted()), Some(false));
    }
}
