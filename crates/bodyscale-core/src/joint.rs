//! Skeleton joints: a closed set of torso joint names and the skeleton
//! snapshot that maps them to body-local transforms.

use std::collections::BTreeMap;

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

/// A tracked torso joint.
///
/// Spine and neck joints are numbered bottom to top. The serialized form
/// is the tracker's raw joint name (e.g. `spine_7_joint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointName {
    /// Skeleton root, at the hips.
    #[serde(rename = "root")]
    Root,
    /// Lowest tracked spine joint.
    #[serde(rename = "spine_2_joint")]
    Spine2,
    /// Spine joint 3.
    #[serde(rename = "spine_3_joint")]
    Spine3,
    /// Spine joint 4.
    #[serde(rename = "spine_4_joint")]
    Spine4,
    /// Spine joint 5.
    #[serde(rename = "spine_5_joint")]
    Spine5,
    /// Spine joint 6.
    #[serde(rename = "spine_6_joint")]
    Spine6,
    /// Top of the spine, between the shoulders.
    #[serde(rename = "spine_7_joint")]
    Spine7,
    /// Base of the neck.
    #[serde(rename = "neck_1_joint")]
    Neck1,
    /// Neck joint 2.
    #[serde(rename = "neck_2_joint")]
    Neck2,
    /// Neck joint 3.
    #[serde(rename = "neck_3_joint")]
    Neck3,
    /// Top of the neck.
    #[serde(rename = "neck_4_joint")]
    Neck4,
    /// Right shoulder.
    #[serde(rename = "right_arm_joint")]
    RightArm,
    /// Left shoulder.
    #[serde(rename = "left_arm_joint")]
    LeftArm,
}

impl JointName {
    /// Every joint, root first, then spine and neck bottom to top, then arms.
    pub const ALL: [Self; 13] = [
        Self::Root,
        Self::Spine2,
        Self::Spine3,
        Self::Spine4,
        Self::Spine5,
        Self::Spine6,
        Self::Spine7,
        Self::Neck1,
        Self::Neck2,
        Self::Neck3,
        Self::Neck4,
        Self::RightArm,
        Self::LeftArm,
    ];

    /// The tracker's raw name for this joint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Spine2 => "spine_2_joint",
            Self::Spine3 => "spine_3_joint",
            Self::Spine4 => "spine_4_joint",
            Self::Spine5 => "spine_5_joint",
            Self::Spine6 => "spine_6_joint",
            Self::Spine7 => "spine_7_joint",
            Self::Neck1 => "neck_1_joint",
            Self::Neck2 => "neck_2_joint",
            Self::Neck3 => "neck_3_joint",
            Self::Neck4 => "neck_4_joint",
            Self::RightArm => "right_arm_joint",
            Self::LeftArm => "left_arm_joint",
        }
    }
}

impl std::fmt::Display for JointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized joint name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown joint name: {0}")]
pub struct UnknownJoint(pub String);

impl std::str::FromStr for JointName {
    type Err = UnknownJoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|joint| joint.as_str() == s)
            .ok_or_else(|| UnknownJoint(s.to_string()))
    }
}

/// A named joint with its body-local (model space) transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Which joint this is.
    pub name: JointName,
    /// Position and orientation relative to the body anchor.
    pub transform: Matrix4<f64>,
}

/// One frame's skeleton: the body anchor's world transform and each
/// tracked joint's model transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// World transform of the body anchor (the skeleton root's frame).
    pub anchor: Matrix4<f64>,
    /// Model transforms keyed by joint.
    pub joints: BTreeMap<JointName, Matrix4<f64>>,
}

impl Skeleton {
    /// Create a skeleton with no joints.
    #[must_use]
    pub const fn new(anchor: Matrix4<f64>) -> Self {
        Self {
            anchor,
            joints: BTreeMap::new(),
        }
    }

    /// Builder-style insertion of a joint's model transform.
    #[must_use]
    pub fn with_joint(mut self, name: JointName, transform: Matrix4<f64>) -> Self {
        self.joints.insert(name, transform);
        self
    }

    /// Look up a joint.
    #[must_use]
    pub fn joint(&self, name: JointName) -> Option<Joint> {
        self.joints.get(&name).map(|&transform| Joint { name, transform })
    }

    /// World-space position of a joint (`anchor * model` applied to the
    /// origin).
    #[must_use]
    pub fn world_position(&self, name: JointName) -> Option<Point3<f64>> {
        self.joints
            .get(&name)
            .map(|model| translation_of(&(self.anchor * model)))
    }
}

/// Translation column of a homogeneous transform.
#[must_use]
pub fn translation_of(transform: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}
