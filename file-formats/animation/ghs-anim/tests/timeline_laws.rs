use ghs_anim::Timeline;
use ghs_anim::timeline::{invert, sample_at, simplify, union};
use proptest::prelude::*;

fn timeline() -> impl Strategy<Value = Timeline> {
    prop::collection::vec((0i32..200, any::<bool>()), 0..24).prop_map(Timeline::from_samples)
}

proptest! {
    #[test]
    fn simplify_is_idempotent(t in timeline()) {
        let once = simplify(&t);
        prop_assert_eq!(simplify(&once), once);
    }

    #[test]
    fn simplify_keeps_playback(t in timeline(), frame in 0i32..220) {
        prop_assert_eq!(simplify(&t).visible_at(frame), t.visible_at(frame));
    }

    #[test]
    fn invert_is_an_involution(t in timeline()) {
        let back = invert(&invert(&t));
        for &(frame, _) in t.samples() {
            prop_assert_eq!(sample_at(&back, frame), sample_at(&t, frame));
        }
        prop_assert_eq!(back, t);
    }

    #[test]
    fn union_of_one_is_identity(t in timeline()) {
        prop_assert_eq!(union([&t]), t);
    }

    #[test]
    fn union_is_visible_when_any_input_is(a in timeline(), b in timeline(), frame in 0i32..220) {
        let joined = union([&a, &b]);
        if !a.is_empty() && !b.is_empty() {
            prop_assert_eq!(joined.visible_at(frame), a.visible_at(frame) || b.visible_at(frame));
        }
    }

    #[test]
    fn union_only_adds_frame_zero(a in timeline(), b in timeline()) {
        let joined = union([&a, &b]);
        for &(frame, _) in joined.samples() {
            prop_assert!(
                frame == 0 || a.has_sample_at(frame) || b.has_sample_at(frame)
            );
        }
    }
}
