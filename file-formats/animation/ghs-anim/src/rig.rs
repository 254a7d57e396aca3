//! GHS character descriptions
//!
//! A `.ghs` description is JSON with three top-level lists:
//!
//! - `bone_parenting_info`: one entry per joint, `{parent, posx, posy, posz}`
//! - `default_body_parts`: one entry per joint, `{pm2}` naming the submodel
//!   shown when no keyframe overrides it
//! - `animations`: one clip per entry, `{anim_len, animation_data}` where
//!   `animation_data[joint]` is that joint's keyframe list

use std::fs;
use std::path::Path;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AnimError, Result};
use crate::pose::PoseTrack;

/// Index of a joint in the rig
pub type JointId = usize;

/// Submodel number; files are named `{id:03x}.pm2`
pub type SubmodelId = i32;

/// Keyframes at or beyond this frame terminate a joint's list
pub const SENTINEL_FRAME: i32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub parent: Option<JointId>,
    pub rest_position: Vec3,
}

/// Joint hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rig {
    pub joints: Vec<Joint>,
}

impl Rig {
    /// Build a rig, rejecting out-of-range parents and parent cycles
    pub fn new(joints: Vec<Joint>) -> Result<Self> {
        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent
                && parent >= joints.len()
            {
                return Err(AnimError::InvalidRig(format!(
                    "joint {} has parent {} but the rig has {} joints",
                    index,
                    parent,
                    joints.len()
                )));
            }
        }

        for start in 0..joints.len() {
            let mut current = joints[start].parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if parent == start || steps > joints.len() {
                    return Err(AnimError::InvalidRig(format!(
                        "joint {} is its own ancestor",
                        start
                    )));
                }
                current = joints[parent].parent;
            }
        }

        Ok(Self { joints })
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn rest_pose(&self) -> Vec<Vec3> {
        self.joints.iter().map(|j| j.rest_position).collect()
    }
}

/// Default submodel per joint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultBindings {
    by_joint: Vec<Option<SubmodelId>>,
}

impl DefaultBindings {
    pub fn new(by_joint: Vec<Option<SubmodelId>>) -> Self {
        Self { by_joint }
    }

    pub fn get(&self, joint: JointId) -> Option<SubmodelId> {
        self.by_joint.get(joint).copied().flatten()
    }

    /// `(joint, submodel)` for every joint with a default
    pub fn iter(&self) -> impl Iterator<Item = (JointId, SubmodelId)> + '_ {
        self.by_joint
            .iter()
            .enumerate()
            .filter_map(|(joint, id)| id.map(|id| (joint, id)))
    }

    /// Number of joint entries, including those without a default
    pub fn len(&self) -> usize {
        self.by_joint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_joint.is_empty()
    }
}

/// One submodel swap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    #[serde(rename = "keyframe_start", deserialize_with = "frame_number")]
    pub start_frame: i32,
    #[serde(rename = "pm2", default)]
    pub submodel: Option<SubmodelId>,
    #[serde(deserialize_with = "frame_number")]
    pub interp_type: i32,
    #[serde(default)]
    pub interp_start: f32,
    #[serde(default)]
    pub interp_delta: f32,
}

impl Keyframe {
    pub fn new(start_frame: i32, submodel: Option<SubmodelId>) -> Self {
        Self {
            start_frame,
            submodel,
            interp_type: 0,
            interp_start: 0.0,
            interp_delta: 0.0,
        }
    }

    /// Terminating entry at frame 999
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_FRAME, None)
    }

    pub fn with_interp(mut self, interp_type: i32, interp_start: f32, interp_delta: f32) -> Self {
        self.interp_type = interp_type;
        self.interp_start = interp_start;
        self.interp_delta = interp_delta;
        self
    }

    pub fn is_sentinel(&self) -> bool {
        self.start_frame >= SENTINEL_FRAME
    }
}

/// One animation clip
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Declared length in frames
    pub length: i32,
    /// Keyframe lists indexed by joint
    pub keyframes: Vec<Vec<Keyframe>>,
    /// Joint poses, loaded from a separate `.mpr` file
    pub pose: Option<PoseTrack>,
}

impl ClipSpec {
    pub fn new(length: i32, keyframes: Vec<Vec<Keyframe>>) -> Self {
        Self {
            length,
            keyframes,
            pose: None,
        }
    }

    pub fn with_pose(mut self, pose: PoseTrack) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Longest of the declared length, the pose track and the last real keyframe
    pub fn resolved_length(&self) -> i32 {
        let pose_len = self
            .pose
            .as_ref()
            .map_or(0, |p| i32::try_from(p.frame_count()).unwrap_or(i32::MAX));
        let last_key = self
            .keyframes
            .iter()
            .flatten()
            .filter(|k| !k.is_sentinel())
            .map(|k| k.start_frame)
            .max()
            .unwrap_or(0);
        self.length.max(pose_len).max(last_key)
    }

    /// True when any joint has at least one keyframe
    pub fn has_keyframes(&self) -> bool {
        self.keyframes.iter().any(|k| !k.is_empty())
    }
}

/// A fully loaded GHS description
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GhsDescription {
    pub rig: Rig,
    pub defaults: DefaultBindings,
    pub clips: Vec<ClipSpec>,
}

impl GhsDescription {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawGhs = serde_json::from_str(text)?;
        raw.into_description()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Attach pose tracks to clips in order
    pub fn attach_poses<I: IntoIterator<Item = PoseTrack>>(&mut self, poses: I) {
        for (clip, pose) in self.clips.iter_mut().zip(poses) {
            clip.pose = Some(pose);
        }
    }
}

#[derive(Deserialize)]
struct RawGhs {
    bone_parenting_info: Vec<RawBone>,
    #[serde(default)]
    default_body_parts: Vec<RawBodyPart>,
    #[serde(default)]
    animations: Vec<RawAnimation>,
}

#[derive(Deserialize)]
struct RawBone {
    parent: Option<JointId>,
    #[serde(default)]
    posx: f32,
    #[serde(default)]
    posy: f32,
    #[serde(default)]
    posz: f32,
}

#[derive(Deserialize)]
struct RawBodyPart {
    #[serde(default)]
    pm2: Option<SubmodelId>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawAnimation {
    #[serde(deserialize_with = "frame_number")]
    anim_len: i32,
    animation_data: Vec<Vec<Keyframe>>,
}

impl RawGhs {
    fn into_description(self) -> Result<GhsDescription> {
        let rig = Rig::new(
            self.bone_parenting_info
                .into_iter()
                .map(|b| Joint {
                    parent: b.parent,
                    rest_position: Vec3::new(b.posx, b.posy, b.posz),
                })
                .collect(),
        )?;

        if self.default_body_parts.len() > rig.len() {
            return Err(AnimError::InvalidRig(format!(
                "{} default body parts for {} joints",
                self.default_body_parts.len(),
                rig.len()
            )));
        }
        let defaults =
            DefaultBindings::new(self.default_body_parts.into_iter().map(|p| p.pm2).collect());

        let clips: Vec<ClipSpec> = self
            .animations
            .into_iter()
            .map(|a| ClipSpec::new(a.anim_len, a.animation_data))
            .collect();
        validate_clips(&rig, &clips)?;

        debug!(
            "GHS description: {} joints, {} defaults, {} clips",
            rig.len(),
            defaults.iter().count(),
            clips.len()
        );
        Ok(GhsDescription {
            rig,
            defaults,
            clips,
        })
    }
}

/// Reject clips that key joints missing from the rig
pub fn validate_clips(rig: &Rig, clips: &[ClipSpec]) -> Result<()> {
    for (index, clip) in clips.iter().enumerate() {
        if clip.keyframes.len() > rig.len() {
            return Err(AnimError::InvalidRig(format!(
                "clip {} keys {} joints but the rig has {}",
                index,
                clip.keyframes.len(),
                rig.len()
            )));
        }
    }
    Ok(())
}

/// Accept integral frame numbers written as JSON floats
fn frame_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "frame number {} out of range",
            value
        )));
    }
    Ok(value as i32)
}
