//! Keyed scalar and vector curves

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Values that can be linearly interpolated
pub trait Lerp: Copy {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }
}

/// How the segment after a key is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Hold the key's value until the next key
    Step,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey<T> {
    pub frame: i32,
    pub value: T,
    pub interpolation: Interpolation,
}

/// Frame-ordered keys, at most one per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve<T> {
    keys: Vec<CurveKey<T>>,
}

impl<T> Default for Curve<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T: Lerp> Curve<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing value and interpolation of any key at the same frame
    pub fn insert(&mut self, frame: i32, value: T, interpolation: Interpolation) {
        let key = CurveKey {
            frame,
            value,
            interpolation,
        };
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(index) => self.keys[index] = key,
            Err(index) => self.keys.insert(index, key),
        }
    }

    /// Start a segment at `frame`
    ///
    /// A key already at `frame` keeps its value and takes the new
    /// interpolation; otherwise a new key is inserted. Returns true when a
    /// key was inserted.
    pub fn begin_segment(&mut self, frame: i32, value: T, interpolation: Interpolation) -> bool {
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(index) => {
                self.keys[index].interpolation = interpolation;
                false
            }
            Err(index) => {
                self.keys.insert(
                    index,
                    CurveKey {
                        frame,
                        value,
                        interpolation,
                    },
                );
                true
            }
        }
    }

    pub fn keys(&self) -> &[CurveKey<T>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn has_key_at(&self, frame: i32) -> bool {
        self.keys.binary_search_by_key(&frame, |k| k.frame).is_ok()
    }

    /// Change the interpolation of the last key, if any
    pub fn set_last_interpolation(&mut self, interpolation: Interpolation) {
        if let Some(last) = self.keys.last_mut() {
            last.interpolation = interpolation;
        }
    }

    /// Evaluate the curve, holding the first and last values outside the keyed range
    pub fn sample(&self, frame: f32) -> Option<T> {
        let index = find_key_index(&self.keys, frame)?;
        let key = &self.keys[index];
        let Some(next) = self.keys.get(index + 1) else {
            return Some(key.value);
        };
        if frame <= key.frame as f32 || key.interpolation == Interpolation::Step {
            return Some(key.value);
        }
        let t = (frame - key.frame as f32) / (next.frame - key.frame) as f32;
        Some(key.value.lerp(&next.value, t))
    }
}

/// Index of the last key at or before `frame`, or the first key when `frame` precedes it
fn find_key_index<T>(keys: &[CurveKey<T>], frame: f32) -> Option<usize> {
    if keys.is_empty() {
        return None;
    }
    let after = keys.partition_point(|k| k.frame as f32 <= frame);
    Some(after.saturating_sub(1))
}
