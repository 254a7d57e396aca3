//! Mutable state for one compilation pass

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use ghs_pm2::Model;
use log::{debug, trace, warn};

use super::interp::{advance_start_weight, interpolation_endpoints};
use super::output::{
    Axis, BlendWeightTarget, CarrierId, CarrierRecord, ClipRange, CompiledAnimation,
    CompiledTrack, PoseCurves, SlotId, SlotRecord, SlotRole,
};
use crate::curve::{Curve, Interpolation};
use crate::error::{AnimError, Result};
use crate::loader::SubmodelLoader;
use crate::pose::PoseTrack;
use crate::rig::{
    ClipSpec, DefaultBindings, JointId, Keyframe, Rig, SENTINEL_FRAME, SubmodelId,
    validate_clips,
};
use crate::strategy::{BlendWeightMode, CompileOptions, ScheduleStrategy};
use crate::timeline::{Timeline, invert, simplify, union};
use crate::warning::CompileWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Default,
    Override,
    /// Keyframe without a usable id; never shared and dropped from the output
    Disposable,
}

#[derive(Debug)]
struct Slot {
    joint: JointId,
    submodel: Option<SubmodelId>,
    replica: Option<usize>,
    role: Role,
    model: Option<Rc<Model>>,
}

#[derive(Debug, Default)]
struct TrackState {
    clips: Vec<ClipRange>,
    replica: Option<usize>,
    pose: BTreeMap<JointId, PoseCurves>,
    visibility: BTreeMap<usize, Timeline>,
    blend: BTreeMap<usize, Curve<f32>>,
    carrier_curves: BTreeMap<usize, Curve<f32>>,
}

/// Where one clip lands
#[derive(Debug, Clone, Copy)]
struct ClipContext {
    clip: usize,
    track: usize,
    replica: Option<usize>,
    offset: i32,
    /// Start frame of the following clip
    end_hide: i32,
    is_last: bool,
}

/// One keyframe after interpolation and frame repair
#[derive(Debug, Clone, Copy)]
struct KeyframeStep {
    index: usize,
    start: i32,
    submodel: Option<SubmodelId>,
    previous: Option<SubmodelId>,
    next_start: Option<i32>,
    next_submodel: Option<SubmodelId>,
    pending_hide: Option<i32>,
    slot: usize,
    created: bool,
}

/// State threaded through every step of a compilation pass
///
/// Slots are stored in an arena and addressed by index; the maps below
/// record which slot a `(joint, submodel, replica)` triple resolved to,
/// which slots each joint and clip touched, and which models were loaded.
pub struct CompilerSession<'a> {
    rig: &'a Rig,
    options: CompileOptions,
    loader: &'a mut dyn SubmodelLoader,

    slots: Vec<Slot>,
    slot_lookup: HashMap<(JointId, SubmodelId, Option<usize>), usize>,
    default_ids: Vec<(JointId, SubmodelId)>,
    default_slots: BTreeMap<(JointId, Option<usize>), usize>,
    animate_defaults: bool,
    joint_slots: BTreeMap<JointId, Vec<usize>>,
    clip_slots: Vec<BTreeSet<usize>>,

    models: HashMap<SubmodelId, Option<Rc<Model>>>,
    default_models: HashMap<SubmodelId, Option<Rc<Model>>>,

    carriers: Vec<usize>,
    carrier_lookup: HashMap<usize, usize>,

    tracks: Vec<TrackState>,
    touched_curves: BTreeSet<usize>,
    touched_carriers: BTreeSet<usize>,
    guarded: BTreeSet<usize>,

    warnings: Vec<CompileWarning>,
}

impl<'a> CompilerSession<'a> {
    pub fn new(rig: &'a Rig, options: CompileOptions, loader: &'a mut dyn SubmodelLoader) -> Self {
        Self {
            rig,
            options,
            loader,
            slots: Vec::new(),
            slot_lookup: HashMap::new(),
            default_ids: Vec::new(),
            default_slots: BTreeMap::new(),
            animate_defaults: false,
            joint_slots: BTreeMap::new(),
            clip_slots: Vec::new(),
            models: HashMap::new(),
            default_models: HashMap::new(),
            carriers: Vec::new(),
            carrier_lookup: HashMap::new(),
            tracks: Vec::new(),
            touched_curves: BTreeSet::new(),
            touched_carriers: BTreeSet::new(),
            guarded: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Bind the default submodels without animating anything
    pub fn rest_pose(mut self, defaults: &DefaultBindings) -> Result<CompiledAnimation> {
        self.check_defaults(defaults)?;
        self.bind_defaults(defaults);
        self.create_default_slots(None);
        Ok(self.finish())
    }

    /// Compile every clip into tracks according to the session's options
    pub fn compile(
        mut self,
        defaults: &DefaultBindings,
        clips: &[ClipSpec],
    ) -> Result<CompiledAnimation> {
        self.check_defaults(defaults)?;
        validate_clips(self.rig, clips)?;

        let strategy = self.options.strategy;
        let replica_mode = strategy == ScheduleStrategy::ReplicaPerClip;
        self.animate_defaults = clips.iter().any(ClipSpec::has_keyframes);
        self.clip_slots = vec![BTreeSet::new(); clips.len()];

        self.bind_defaults(defaults);
        if !replica_mode {
            self.create_default_slots(None);
        }

        if strategy.is_concat() {
            if !clips.is_empty() {
                self.tracks.push(TrackState::default());
            }
        } else {
            for index in 0..clips.len() {
                self.tracks.push(TrackState {
                    replica: replica_mode.then_some(index),
                    ..TrackState::default()
                });
            }
        }

        let mut offset = 0;
        for (index, clip) in clips.iter().enumerate() {
            let replica = replica_mode.then_some(index);
            if replica_mode {
                self.models = self.default_models.clone();
                self.create_default_slots(replica);
            }

            let length = clip.resolved_length();
            let next_offset = strategy.next_offset(offset, length).ok_or_else(|| {
                AnimError::InvalidRig(format!(
                    "clip {} with {} frames at offset {} runs past the last representable frame",
                    index, length, offset
                ))
            })?;
            let ctx = ClipContext {
                clip: index,
                track: if strategy.is_concat() { 0 } else { index },
                replica,
                offset,
                end_hide: next_offset,
                is_last: index + 1 == clips.len(),
            };
            debug!(
                "clip {}: {} frames at offset {} on track {}",
                index, length, offset, ctx.track
            );

            self.tracks[ctx.track].clips.push(ClipRange {
                clip: index,
                start: offset,
                length,
                declared_length: clip.length,
            });

            self.compile_clip(&ctx, clip);

            if strategy.is_concat() {
                self.close_concat_clip(ctx.track);
                offset = next_offset;
            }
        }

        if strategy == ScheduleStrategy::ParallelTracks {
            self.hide_slots_unused_per_track();
        }
        for track in 0..self.tracks.len() {
            self.resolve_defaults(track);
        }

        Ok(self.finish())
    }

    fn check_defaults(&self, defaults: &DefaultBindings) -> Result<()> {
        if defaults.len() > self.rig.len() {
            return Err(AnimError::InvalidRig(format!(
                "{} default bindings for {} joints",
                defaults.len(),
                self.rig.len()
            )));
        }
        Ok(())
    }

    fn warn(&mut self, warning: CompileWarning) {
        if !self.warnings.contains(&warning) {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }

    fn load_model(&mut self, submodel: SubmodelId) -> Option<Rc<Model>> {
        if let Some(cached) = self.models.get(&submodel) {
            return cached.clone();
        }
        let model = match self.loader.load_submodel(submodel) {
            Ok(Some(model)) => {
                trace!(
                    "loaded submodel {:03x}: {} vertices",
                    submodel,
                    model.vertex_count()
                );
                Some(Rc::new(model))
            }
            Ok(None) => {
                self.warn(CompileWarning::MissingAsset { submodel });
                None
            }
            Err(e) => {
                self.warn(CompileWarning::SubmodelDecodeFailed {
                    submodel,
                    message: e.to_string(),
                });
                None
            }
        };
        self.models.insert(submodel, model.clone());
        model
    }

    fn bind_defaults(&mut self, defaults: &DefaultBindings) {
        for (joint, submodel) in defaults.iter() {
            if submodel < 0 {
                self.warn(CompileWarning::NegativeSubmodel { joint, submodel });
                continue;
            }
            self.load_model(submodel);
            self.default_ids.push((joint, submodel));
        }
        self.default_models = self.models.clone();
    }

    fn create_default_slots(&mut self, replica: Option<usize>) {
        for (joint, submodel) in self.default_ids.clone() {
            let model = self.default_models.get(&submodel).cloned().flatten();
            let slot = self.push_slot(Slot {
                joint,
                submodel: Some(submodel),
                replica,
                role: Role::Default,
                model,
            });
            self.slot_lookup.insert((joint, submodel, replica), slot);
            self.default_slots.insert((joint, replica), slot);
        }
    }

    fn push_slot(&mut self, slot: Slot) -> usize {
        let index = self.slots.len();
        trace!(
            "slot {}: joint {} submodel {:?} replica {:?} {:?}",
            index, slot.joint, slot.submodel, slot.replica, slot.role
        );
        self.slots.push(slot);
        index
    }

    /// Default slot that takes part in visibility resolution
    fn active_default(&self, joint: JointId, replica: Option<usize>) -> Option<usize> {
        if !self.animate_defaults {
            return None;
        }
        self.default_slots.get(&(joint, replica)).copied()
    }

    fn compile_clip(&mut self, ctx: &ClipContext, clip: &ClipSpec) {
        if let Some(pose) = &clip.pose {
            self.add_pose_curves(ctx, pose);
        }

        if clip.keyframes.is_empty() {
            let defaults: Vec<usize> = self
                .default_slots
                .iter()
                .filter(|((_, replica), _)| *replica == ctx.replica)
                .map(|(_, &slot)| slot)
                .collect();
            self.clip_slots[ctx.clip].extend(defaults);
            return;
        }

        for (joint, keyframes) in clip.keyframes.iter().enumerate() {
            if keyframes.is_empty() {
                if let Some(default) = self.active_default(joint, ctx.replica) {
                    self.clip_slots[ctx.clip].insert(default);
                    self.tracks[ctx.track]
                        .visibility
                        .entry(default)
                        .or_default()
                        .insert(ctx.offset, true);
                }
                continue;
            }
            self.compile_joint(ctx, joint, keyframes);
        }
    }

    fn add_pose_curves(&mut self, ctx: &ClipContext, pose: &PoseTrack) {
        let concat = self.options.strategy.is_concat();
        for (joint, samples) in pose.joints() {
            if joint >= self.rig.len() {
                self.warn(CompileWarning::UnknownPoseJoint {
                    clip: ctx.clip,
                    joint,
                });
                continue;
            }
            let curves = self.tracks[ctx.track].pose.entry(joint).or_default();
            for (frame, (&position, &rotation)) in samples
                .positions
                .iter()
                .zip(&samples.rotations)
                .enumerate()
            {
                let frame = ctx.offset + frame as i32;
                curves
                    .location
                    .insert(frame, position, Interpolation::Linear);
                curves
                    .rotation
                    .insert(frame, rotation, Interpolation::Linear);
            }
            if concat {
                curves.location.set_last_interpolation(Interpolation::Step);
                curves.rotation.set_last_interpolation(Interpolation::Step);
            }
        }
    }

    fn compile_joint(&mut self, ctx: &ClipContext, joint: JointId, keyframes: &[Keyframe]) {
        let mut previous = None;
        let mut pending_hide: Option<i32> = None;

        for (index, keyframe) in keyframes.iter().enumerate() {
            if keyframe.is_sentinel() {
                break;
            }
            let next = keyframes.get(index + 1);
            let next_start = next.map(|k| k.start_frame);

            let (mut interp_start, interp_end) = match interpolation_endpoints(keyframe) {
                Some(endpoints) => endpoints,
                None => {
                    self.warn(CompileWarning::UnknownInterpolationType {
                        clip: ctx.clip,
                        joint,
                        keyframe: index,
                        interp_type: keyframe.interp_type,
                    });
                    (0.0, 0.0)
                }
            };

            // A keyframe sharing its frame with the one before it is pushed
            // one frame later, and its weight advanced to match.
            let mut start = keyframe.start_frame;
            if let Some(next_start) = next_start {
                if let Some(relocated) = pending_hide {
                    interp_start = advance_start_weight(
                        interp_start,
                        interp_end,
                        start,
                        relocated,
                        next_start,
                    );
                    start = relocated;
                }
                pending_hide = (next_start <= start).then_some(start + 1);
            }

            let (slot, created) = self.slot_for_keyframe(joint, keyframe.submodel, ctx.replica);
            self.clip_slots[ctx.clip].insert(slot);
            self.joint_slots.entry(joint).or_default().push(slot);

            let step = KeyframeStep {
                index,
                start,
                submodel: keyframe.submodel,
                previous,
                next_start,
                next_submodel: next.and_then(|k| k.submodel),
                pending_hide,
                slot,
                created,
            };
            self.add_visibility_samples(ctx, joint, &step);
            previous = keyframe.submodel;

            let Some(submodel) = keyframe.submodel else {
                continue;
            };
            let Some(model) = self.model_for_slot(joint, submodel, slot) else {
                continue;
            };
            if model.animated() {
                self.add_blend_keys(ctx, &step, interp_start, interp_end);
            }
        }
    }

    fn slot_for_keyframe(
        &mut self,
        joint: JointId,
        submodel: Option<SubmodelId>,
        replica: Option<usize>,
    ) -> (usize, bool) {
        match submodel {
            Some(id) if id >= 0 => {
                if let Some(&slot) = self.slot_lookup.get(&(joint, id, replica)) {
                    return (slot, false);
                }
                let slot = self.push_slot(Slot {
                    joint,
                    submodel: Some(id),
                    replica,
                    role: Role::Override,
                    model: None,
                });
                self.slot_lookup.insert((joint, id, replica), slot);
                (slot, true)
            }
            _ => {
                let slot = self.push_slot(Slot {
                    joint,
                    submodel,
                    replica,
                    role: Role::Disposable,
                    model: None,
                });
                (slot, true)
            }
        }
    }

    fn model_for_slot(
        &mut self,
        joint: JointId,
        submodel: SubmodelId,
        slot: usize,
    ) -> Option<Rc<Model>> {
        if submodel < 0 {
            self.warn(CompileWarning::NegativeSubmodel { joint, submodel });
            return None;
        }
        let model = self.load_model(submodel)?;
        let entry = &mut self.slots[slot];
        if entry.model.is_none() {
            entry.model = Some(Rc::clone(&model));
        }
        Some(model)
    }

    fn add_visibility_samples(&mut self, ctx: &ClipContext, joint: JointId, step: &KeyframeStep) {
        let concat = self.options.strategy.is_concat();
        let default = self.active_default(joint, ctx.replica);
        let visibility = &mut self.tracks[ctx.track].visibility;

        if concat
            && let Some(default) = default
            && default != step.slot
        {
            visibility
                .entry(default)
                .or_default()
                .insert(ctx.offset, false);
        }

        let timeline = visibility.entry(step.slot).or_default();
        if concat {
            if step.created {
                timeline.insert(0, false);
            }
            if !ctx.is_last {
                timeline.insert(ctx.end_hide, false);
            }
            if step.index == 0 && step.start > 0 {
                timeline.insert(ctx.offset, true);
            }
        }

        timeline.insert(ctx.offset + step.start, true);
        if step.previous != step.submodel && step.start > 0 && step.index > 0 {
            timeline.insert(ctx.offset + step.start - 1, false);
        }
        if step.submodel != step.next_submodel
            && let Some(next_start) = step.next_start
            && next_start < SENTINEL_FRAME
        {
            timeline.insert(ctx.offset + next_start, false);
        }
        if let Some(hide) = step.pending_hide {
            timeline.insert(ctx.offset + hide, false);
        }
    }

    fn add_blend_keys(
        &mut self,
        ctx: &ClipContext,
        step: &KeyframeStep,
        interp_start: f32,
        interp_end: f32,
    ) {
        let concat = self.options.strategy.is_concat();
        let key_frame = ctx.offset + step.start;
        let first = if interp_start == interp_end {
            Interpolation::Step
        } else {
            Interpolation::Linear
        };
        let next_key = step
            .next_start
            .filter(|&frame| frame < SENTINEL_FRAME)
            .map(|frame| ctx.offset + frame);

        // The first key of each slot in a clip also holds its weight from
        // the clip's start, so the previous clip's last key does not bleed
        // into this one.
        let guard = concat && self.guarded.insert(step.slot) && ctx.offset < key_frame;

        let curve = match self.options.blend_weights {
            BlendWeightMode::Direct => {
                self.touched_curves.insert(step.slot);
                self.tracks[ctx.track]
                    .blend
                    .entry(step.slot)
                    .or_default()
            }
            BlendWeightMode::CarrierChannel => {
                let carrier = self.carrier_for(step.slot);
                self.touched_carriers.insert(carrier);
                self.tracks[ctx.track]
                    .carrier_curves
                    .entry(carrier)
                    .or_default()
            }
        };
        if guard {
            curve.begin_segment(ctx.offset, interp_start, Interpolation::Step);
        }

        // A span ending where this one starts has already set the weight
        // reached at this frame.
        curve.begin_segment(key_frame, interp_start, first);
        if let Some(next_key) = next_key {
            curve.insert(next_key, interp_end, Interpolation::Linear);
        }
    }

    fn carrier_for(&mut self, slot: usize) -> usize {
        if let Some(&carrier) = self.carrier_lookup.get(&slot) {
            return carrier;
        }
        let carrier = self.carriers.len();
        trace!("carrier {} for slot {}", carrier, slot);
        self.carriers.push(slot);
        self.carrier_lookup.insert(slot, carrier);
        carrier
    }

    fn close_concat_clip(&mut self, track: usize) {
        let state = &mut self.tracks[track];
        for slot in std::mem::take(&mut self.touched_curves) {
            if let Some(curve) = state.blend.get_mut(&slot) {
                curve.set_last_interpolation(Interpolation::Step);
            }
        }
        for carrier in std::mem::take(&mut self.touched_carriers) {
            if let Some(curve) = state.carrier_curves.get_mut(&carrier) {
                curve.set_last_interpolation(Interpolation::Step);
            }
        }
        self.guarded.clear();
    }

    /// Hide, at frame 0, every slot another clip uses but this clip does not
    fn hide_slots_unused_per_track(&mut self) {
        let all: BTreeSet<usize> = self.clip_slots.iter().flatten().copied().collect();
        for (clip, used) in self.clip_slots.iter().enumerate() {
            let track = &mut self.tracks[clip];
            for &slot in all.difference(used) {
                let timeline = track.visibility.entry(slot).or_default();
                if !timeline.has_sample_at(0) {
                    timeline.insert(0, false);
                }
            }
        }
    }

    /// Show each default exactly when none of its joint's overrides is visible
    fn resolve_defaults(&mut self, track: usize) {
        let concat = self.options.strategy.is_concat();
        let state = &mut self.tracks[track];
        for timeline in state.visibility.values_mut() {
            *timeline = simplify(timeline);
        }
        if !self.animate_defaults {
            return;
        }

        for (&(joint, replica), &default) in &self.default_slots {
            if replica != state.replica {
                continue;
            }
            let Some(used) = self.joint_slots.get(&joint) else {
                continue;
            };
            let overrides: BTreeSet<usize> =
                used.iter().copied().filter(|&slot| slot != default).collect();
            let overridden = union(overrides.iter().filter_map(|slot| state.visibility.get(slot)));

            let mut shown = state
                .visibility
                .get(&default)
                .cloned()
                .unwrap_or_default();
            if concat && shown.first().is_some_and(|(frame, _)| frame != 0) {
                shown.insert(0, false);
            }

            let resolved = simplify(&union([&shown, &invert(&overridden)]));
            trace!(
                "track {}: default slot {} resolved to {:?}",
                track,
                default,
                resolved.samples()
            );
            state.visibility.insert(default, resolved);
        }
    }

    /// True when every track the slot takes part in hides it throughout
    fn is_always_hidden(&self, index: usize) -> bool {
        let replica = self.slots[index].replica;
        let mut participating = self
            .tracks
            .iter()
            .filter(|t| replica.is_none() || t.replica == replica)
            .peekable();
        participating.peek().is_some()
            && participating.all(|t| {
                t.visibility
                    .get(&index)
                    .is_some_and(Timeline::is_always_hidden)
            })
    }

    fn finish(self) -> CompiledAnimation {
        let kept: BTreeSet<usize> = (0..self.slots.len())
            .filter(|&index| match self.slots[index].role {
                Role::Disposable => false,
                Role::Default | Role::Override => {
                    if self.is_always_hidden(index) {
                        debug!("pruning slot {}: never visible", index);
                        false
                    } else {
                        true
                    }
                }
            })
            .collect();

        let mut slots = BTreeMap::new();
        for &index in &kept {
            let slot = &self.slots[index];
            // Kept slots always carry an id; disposable ones were dropped above
            let Some(submodel) = slot.submodel else {
                continue;
            };
            slots.insert(
                SlotId(index),
                SlotRecord {
                    joint: slot.joint,
                    submodel,
                    replica: slot.replica,
                    role: match slot.role {
                        Role::Default => SlotRole::Default,
                        Role::Override | Role::Disposable => SlotRole::Override,
                    },
                    animated: slot.model.as_ref().is_some_and(|m| m.animated()),
                    model: slot.model.clone(),
                },
            );
        }

        let carriers: BTreeMap<CarrierId, CarrierRecord> = self
            .carriers
            .iter()
            .enumerate()
            .filter(|&(_, &slot)| kept.contains(&slot))
            .map(|(carrier, &slot)| {
                (
                    CarrierId(carrier),
                    CarrierRecord {
                        slot: SlotId(slot),
                        axis: Axis::X,
                    },
                )
            })
            .collect();

        let tracks = self
            .tracks
            .into_iter()
            .map(|state| {
                let mut blend_weights: BTreeMap<SlotId, BlendWeightTarget> = state
                    .blend
                    .into_iter()
                    .filter(|(slot, _)| kept.contains(slot))
                    .map(|(slot, curve)| (SlotId(slot), BlendWeightTarget::Direct(curve)))
                    .collect();
                let carrier_curves: BTreeMap<CarrierId, Curve<f32>> = state
                    .carrier_curves
                    .into_iter()
                    .map(|(carrier, curve)| (CarrierId(carrier), curve))
                    .filter(|(carrier, _)| carriers.contains_key(carrier))
                    .collect();
                for carrier in carrier_curves.keys() {
                    if let Some(record) = carriers.get(carrier) {
                        blend_weights.insert(
                            record.slot,
                            BlendWeightTarget::CarrierChannel {
                                carrier: *carrier,
                                axis: record.axis,
                            },
                        );
                    }
                }

                CompiledTrack {
                    clips: state.clips,
                    replica: state.replica,
                    pose_curves: state.pose,
                    visibility: state
                        .visibility
                        .into_iter()
                        .filter(|(slot, _)| kept.contains(slot))
                        .map(|(slot, timeline)| (SlotId(slot), timeline))
                        .collect(),
                    blend_weights,
                    carrier_curves,
                }
            })
            .collect();

        debug!(
            "compiled {} slots, {} carriers, {} warnings",
            slots.len(),
            carriers.len(),
            self.warnings.len()
        );

        CompiledAnimation {
            options: self.options,
            rest_pose: self.rig.rest_pose(),
            slots,
            carriers,
            tracks,
            warnings: self.warnings,
        }
    }
}
