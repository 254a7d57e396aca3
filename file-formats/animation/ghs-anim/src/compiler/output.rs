//! Compiled animation data handed to scene builders

use std::collections::BTreeMap;
use std::rc::Rc;

use ghs_pm2::Model;
use glam::Vec3;
use serde::Serialize;

use crate::curve::Curve;
use crate::rig::{JointId, SubmodelId};
use crate::strategy::CompileOptions;
use crate::timeline::Timeline;
use crate::warning::CompileWarning;

/// Stable token for one submodel slot within a compilation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SlotId(pub usize);

/// Stable token for one carrier joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CarrierId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotRole {
    /// The joint's default submodel, shown whenever no override is visible
    Default,
    /// A submodel swapped in by keyframes
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

/// A submodel bound under a joint
#[derive(Debug, Clone, Serialize)]
pub struct SlotRecord {
    pub joint: JointId,
    pub submodel: SubmodelId,
    /// Clip index of the copy this slot belongs to, replica-per-clip only
    pub replica: Option<usize>,
    pub role: SlotRole,
    /// True when the bound model carries morph deltas
    pub animated: bool,
    /// Decoded geometry, `None` when the loader could not provide it
    #[serde(skip)]
    pub model: Option<Rc<Model>>,
}

impl SlotRecord {
    /// Scene name such as `b3_p01a` or `a2_b3_p01a` for replicas
    pub fn name(&self) -> String {
        let base = format!("b{}_p{:03x}", self.joint, self.submodel);
        match self.replica {
            Some(replica) => format!("a{}_{}", replica, base),
            None => base,
        }
    }
}

/// A joint parented under a slot whose location channel carries a blend weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarrierRecord {
    pub slot: SlotId,
    /// Location channel holding the weight
    pub axis: Axis,
}

/// Where a slot's morph weight is animated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendWeightTarget {
    /// Weight curve owned by the slot
    Direct(Curve<f32>),
    /// Weight read back from a carrier joint's location channel
    CarrierChannel { carrier: CarrierId, axis: Axis },
}

/// Location and ZXY Euler rotation curves for one joint
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PoseCurves {
    pub location: Curve<Vec3>,
    pub rotation: Curve<Vec3>,
}

/// Placement of one clip on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipRange {
    pub clip: usize,
    /// Frame at which the clip starts on its track
    pub start: i32,
    /// Resolved length, covering the pose track and the last keyframe
    pub length: i32,
    /// Length declared by the clip itself
    pub declared_length: i32,
}

/// One output action
///
/// Concatenating strategies produce a single track holding every clip,
/// the others one track per clip.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompiledTrack {
    pub clips: Vec<ClipRange>,
    pub replica: Option<usize>,
    pub pose_curves: BTreeMap<JointId, PoseCurves>,
    pub visibility: BTreeMap<SlotId, Timeline>,
    pub blend_weights: BTreeMap<SlotId, BlendWeightTarget>,
    pub carrier_curves: BTreeMap<CarrierId, Curve<f32>>,
}

impl CompiledTrack {
    pub fn visibility(&self, slot: SlotId) -> Option<&Timeline> {
        self.visibility.get(&slot)
    }

    /// Playback visibility; a slot without samples stays visible
    pub fn is_visible(&self, slot: SlotId, frame: i32) -> bool {
        self.visibility
            .get(&slot)
            .is_none_or(|timeline| timeline.visible_at(frame))
    }

    /// Morph weight of `slot` at `frame`, following carrier indirection
    pub fn blend_weight_at(&self, slot: SlotId, frame: f32) -> Option<f32> {
        match self.blend_weights.get(&slot)? {
            BlendWeightTarget::Direct(curve) => curve.sample(frame),
            BlendWeightTarget::CarrierChannel { carrier, .. } => {
                self.carrier_curves.get(carrier)?.sample(frame)
            }
        }
    }

    /// Last frame covered by any clip on this track
    pub fn end_frame(&self) -> i32 {
        self.clips
            .iter()
            .map(|c| c.start.saturating_add(c.length))
            .max()
            .unwrap_or(0)
    }
}

/// Result of compiling a clip set
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompiledAnimation {
    pub options: CompileOptions,
    /// Joint rest positions from the rig
    pub rest_pose: Vec<Vec3>,
    pub slots: BTreeMap<SlotId, SlotRecord>,
    pub carriers: BTreeMap<CarrierId, CarrierRecord>,
    pub tracks: Vec<CompiledTrack>,
    pub warnings: Vec<CompileWarning>,
}

impl CompiledAnimation {
    pub fn slot(&self, slot: SlotId) -> Option<&SlotRecord> {
        self.slots.get(&slot)
    }

    /// Find the slot for a submodel under a joint, in the given replica
    pub fn find_slot(
        &self,
        joint: JointId,
        submodel: SubmodelId,
        replica: Option<usize>,
    ) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|(_, s)| s.joint == joint && s.submodel == submodel && s.replica == replica)
            .map(|(&id, _)| id)
    }

    pub fn slots_for_joint(&self, joint: JointId) -> impl Iterator<Item = (SlotId, &SlotRecord)> {
        self.slots
            .iter()
            .filter(move |(_, s)| s.joint == joint)
            .map(|(&id, s)| (id, s))
    }

    /// Scene name of a carrier joint, derived from its slot
    pub fn carrier_name(&self, carrier: CarrierId) -> Option<String> {
        let record = self.carriers.get(&carrier)?;
        let slot = self.slots.get(&record.slot)?;
        Some(format!("{}_driver", slot.name()))
    }
}
