//! Keyframe blend-weight endpoints

use crate::rig::Keyframe;

/// Start and end weight of a keyframe's span, `None` for unknown codes
///
/// | code | start         | end                     |
/// |------|---------------|-------------------------|
/// | 0    | `interp_start`| `interp_start`          |
/// | 1    | 0             | 1                       |
/// | 2    | `interp_start`| `interp_start + delta`  |
/// | -1   | 1             | 0                       |
pub fn interpolation_endpoints(keyframe: &Keyframe) -> Option<(f32, f32)> {
    match keyframe.interp_type {
        0 => Some((keyframe.interp_start, keyframe.interp_start)),
        1 => Some((0.0, 1.0)),
        2 => Some((
            keyframe.interp_start,
            keyframe.interp_start + keyframe.interp_delta,
        )),
        -1 => Some((1.0, 0.0)),
        _ => None,
    }
}

/// Weight reached after a keyframe's span was partly consumed
///
/// A keyframe originally spanning `start..next_start` is moved to
/// `relocated`; the start weight advances by the fraction of the span
/// already played. An empty span counts as fully played.
pub(crate) fn advance_start_weight(
    interp_start: f32,
    interp_end: f32,
    start: i32,
    relocated: i32,
    next_start: i32,
) -> f32 {
    let span = next_start - start;
    let played = if span == 0 {
        1.0
    } else {
        1.0 - (next_start - relocated) as f32 / span as f32
    };
    interp_start + played * (interp_end - interp_start)
}
