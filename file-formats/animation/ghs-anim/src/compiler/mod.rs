//! Clip set compilation
//!
//! Turns keyframe lists into per-slot visibility timelines, blend weight
//! curves and pose curves laid out on one or more tracks.

mod interp;
mod output;
mod session;

pub use interp::interpolation_endpoints;
pub use output::{
    Axis, BlendWeightTarget, CarrierId, CarrierRecord, ClipRange, CompiledAnimation,
    CompiledTrack, PoseCurves, SlotId, SlotRecord, SlotRole,
};
pub use session::CompilerSession;

use crate::error::Result;
use crate::loader::SubmodelLoader;
use crate::rig::{ClipSpec, DefaultBindings, Rig};
use crate::strategy::CompileOptions;

/// Compile `clips` against `rig`, loading submodels through `loader`
///
/// Missing or undecodable submodels and malformed keyframes are reported in
/// [`CompiledAnimation::warnings`]. Only structural problems, such as a clip
/// keying more joints than the rig has, are errors.
pub fn compile_clip_set(
    rig: &Rig,
    defaults: &DefaultBindings,
    clips: &[ClipSpec],
    options: CompileOptions,
    loader: &mut dyn SubmodelLoader,
) -> Result<CompiledAnimation> {
    CompilerSession::new(rig, options, loader).compile(defaults, clips)
}

/// Bind each joint's default submodel with no animation
pub fn compile_rest_pose(
    rig: &Rig,
    defaults: &DefaultBindings,
    loader: &mut dyn SubmodelLoader,
) -> Result<CompiledAnimation> {
    CompilerSession::new(rig, CompileOptions::default(), loader).rest_pose(defaults)
}
