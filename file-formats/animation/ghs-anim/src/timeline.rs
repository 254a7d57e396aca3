//! Step-function visibility timelines
//!
//! A timeline is a sparse list of `(frame, visible)` samples ordered by
//! frame. Between samples the value of the previous sample holds.
//!
//! The free functions [`union`], [`invert`] and [`simplify`] form the
//! algebra the compiler uses to show a default submodel exactly when no
//! override is visible. None of them reorders frames, and only [`union`]
//! may introduce a frame absent from its inputs (a synthesized frame 0).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One visibility sample
pub type Sample = (i32, bool);

/// Frame-ordered visibility samples, at most one per frame
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    samples: Vec<Sample>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from samples in any order; later samples win on equal frames
    pub fn from_samples<I: IntoIterator<Item = Sample>>(samples: I) -> Self {
        let mut timeline = Self::new();
        for (frame, visible) in samples {
            timeline.insert(frame, visible);
        }
        timeline
    }

    /// Set the value at `frame`, replacing any existing sample there
    pub fn insert(&mut self, frame: i32, visible: bool) {
        match self.samples.binary_search_by_key(&frame, |&(f, _)| f) {
            Ok(index) => self.samples[index].1 = visible,
            Err(index) => self.samples.insert(index, (frame, visible)),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<Sample> {
        self.samples.first().copied()
    }

    pub fn has_sample_at(&self, frame: i32) -> bool {
        self.samples
            .binary_search_by_key(&frame, |&(f, _)| f)
            .is_ok()
    }

    /// True when the timeline has samples and every one of them hides
    pub fn is_always_hidden(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(|&(_, visible)| !visible)
    }

    /// Visibility as a host animation system plays it back
    ///
    /// An empty timeline leaves the submodel visible, and the first sample's
    /// value extends backwards to earlier frames.
    pub fn visible_at(&self, frame: i32) -> bool {
        match self.first() {
            None => true,
            Some((first_frame, first_value)) if frame < first_frame => first_value,
            Some(_) => sample_at(self, frame),
        }
    }
}

impl FromIterator<Sample> for Timeline {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::from_samples(iter)
    }
}

/// Value of the last sample at or before `frame`
///
/// Returns `false` for an empty timeline or a frame before the first sample.
pub fn sample_at(timeline: &Timeline, frame: i32) -> bool {
    let index = timeline.samples.partition_point(|&(f, _)| f <= frame);
    index > 0 && timeline.samples[index - 1].1
}

/// Swap visible and hidden at every sample
pub fn invert(timeline: &Timeline) -> Timeline {
    Timeline {
        samples: timeline
            .samples
            .iter()
            .map(|&(frame, visible)| (frame, !visible))
            .collect(),
    }
}

/// Drop every sample whose value repeats the previous sample's value
pub fn simplify(timeline: &Timeline) -> Timeline {
    let mut samples: Vec<Sample> = Vec::with_capacity(timeline.samples.len());
    for &(frame, visible) in &timeline.samples {
        if samples.last().is_none_or(|&(_, previous)| previous != visible) {
            samples.push((frame, visible));
        }
    }
    Timeline { samples }
}

/// Visible wherever any input is visible
///
/// Empty inputs are ignored, a single remaining input is returned as is.
/// Otherwise each input lacking a frame-0 sample gets one carrying its first
/// value, and every input counts as visible until its first sample.
pub fn union<'a, I>(timelines: I) -> Timeline
where
    I: IntoIterator<Item = &'a Timeline>,
{
    let inputs: Vec<&Timeline> = timelines.into_iter().filter(|t| !t.is_empty()).collect();
    match inputs.as_slice() {
        [] => return Timeline::new(),
        [single] => return (*single).clone(),
        _ => {}
    }

    let mut changes: BTreeMap<i32, Vec<(usize, bool)>> = BTreeMap::new();
    for (index, timeline) in inputs.iter().enumerate() {
        if let Some((first_frame, first_value)) = timeline.first()
            && first_frame > 0
        {
            changes.entry(0).or_default().push((index, first_value));
        }
        for &(frame, visible) in &timeline.samples {
            changes.entry(frame).or_default().push((index, visible));
        }
    }

    let mut current = vec![true; inputs.len()];
    let samples = changes
        .into_iter()
        .map(|(frame, updates)| {
            for (index, visible) in updates {
                current[index] = visible;
            }
            (frame, current.iter().any(|&v| v))
        })
        .collect();
    Timeline { samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tl(samples: &[Sample]) -> Timeline {
        Timeline::from_samples(samples.iter().copied())
    }

    #[test]
    fn test_insert_keeps_order_and_overwrites() {
        let mut timeline = Timeline::new();
        timeline.insert(10, true);
        timeline.insert(0, false);
        timeline.insert(5, true);
        timeline.insert(10, false);
        assert_eq!(timeline.samples(), &[(0, false), (5, true), (10, false)]);
        assert!(timeline.has_sample_at(5));
        assert!(!timeline.has_sample_at(6));
    }

    #[test]
    fn test_sample_at() {
        let timeline = tl(&[(3, true), (7, false)]);
        assert!(!sample_at(&timeline, 0));
        assert!(sample_at(&timeline, 3));
        assert!(sample_at(&timeline, 6));
        assert!(!sample_at(&timeline, 7));
        assert!(!sample_at(&Timeline::new(), 0));
    }

    #[test]
    fn test_visible_at_extends_first_sample_backwards() {
        let timeline = tl(&[(3, false), (7, true)]);
        assert!(!timeline.visible_at(0));
        assert!(timeline.visible_at(9));
        assert!(Timeline::new().visible_at(42));
    }

    #[test]
    fn test_simplify_collapses_runs() {
        let timeline = tl(&[(0, true), (2, true), (4, false), (5, false), (9, true)]);
        assert_eq!(
            simplify(&timeline).samples(),
            &[(0, true), (4, false), (9, true)]
        );
    }

    #[test]
    fn test_union_of_nothing_is_empty() {
        assert!(union([&Timeline::new(), &Timeline::new()]).is_empty());
        assert!(union(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_union_synthesizes_frame_zero() {
        let a = tl(&[(5, false), (10, true)]);
        let b = tl(&[(0, false), (7, true), (12, false)]);
        // `a` reads as hidden from frame 0 since its first value is hidden
        assert_eq!(
            union([&a, &b]).samples(),
            &[(0, false), (5, false), (7, true), (10, true), (12, true)]
        );
    }

    #[test]
    fn test_union_ignores_empty_inputs() {
        let a = tl(&[(4, false)]);
        assert_eq!(union([&Timeline::new(), &a]), a);
    }

    #[test]
    fn test_invert_keeps_frames() {
        let timeline = tl(&[(0, true), (3, false)]);
        assert_eq!(invert(&timeline).samples(), &[(0, false), (3, true)]);
    }

    #[test]
    fn test_always_hidden() {
        assert!(tl(&[(0, false), (4, false)]).is_always_hidden());
        assert!(!tl(&[(0, false), (4, true)]).is_always_hidden());
        assert!(!Timeline::new().is_always_hidden());
    }
}
