//! Joint pose tracks (`.mpr` files)
//!
//! ```text
//! u32 block_count
//! u32 block_offsets[block_count]
//! block:
//!   u16 frame_count, u8 joint, u8 is_float
//!   frame_count x (3 position + 3 rotation) as f32 or s16
//! ```
//!
//! Fixed point samples store position in 1/4096 units and rotation in
//! 1/25600 turns. Rotations are stored with X and Y swapped; the decoded
//! track holds them in `(x, y, z)` Euler order for a ZXY rotation mode.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ghs_pm2::reader::{ByteReader, Cursor};
use glam::Vec3;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};

const POSITION_SCALE: f32 = 4096.0;
const ROTATION_UNITS_PER_TURN: f32 = 25600.0;

/// Per-frame samples for one joint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointPose {
    pub positions: Vec<Vec3>,
    /// Euler angles in radians
    pub rotations: Vec<Vec3>,
}

impl JointPose {
    pub fn frame_count(&self) -> usize {
        self.positions.len()
    }
}

/// A decoded pose track, keyed by joint index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseTrack {
    joints: BTreeMap<usize, JointPose>,
}

impl PoseTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);
        let block_count = reader
            .read_u32()
            .map_err(|e| e.with_context("block count"))?;
        let offsets = reader
            .read_u32_array(block_count as usize)
            .map_err(|e| e.with_context("block offsets"))?;

        let mut track = Self::new();
        for (index, &offset) in offsets.iter().enumerate() {
            if offset as usize >= bytes.len() {
                return Err(AnimError::InvalidPoseTrack(format!(
                    "block {} offset {} is past the end of the {} byte file",
                    index,
                    offset,
                    bytes.len()
                )));
            }
            reader.seek(offset as usize)?;
            track
                .read_block(&mut reader)
                .map_err(|e| e.with_context(&format!("block {}", index)))?;
        }

        debug!(
            "pose track: {} joints, {} frames",
            track.joints.len(),
            track.frame_count()
        );
        Ok(track)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    fn read_block(&mut self, reader: &mut Cursor<'_>) -> ghs_pm2::Result<()> {
        let frame_count = reader.read_u16()?;
        let joint = reader.read_u8()? as usize;
        let is_float = reader.read_u8()? != 0;
        trace!(
            "pose block: joint {}, {} frames, float={}",
            joint, frame_count, is_float
        );

        let pose = self.joints.entry(joint).or_default();
        for _ in 0..frame_count {
            let (position, rotation) = if is_float {
                let v = reader.read_f32_array(6)?;
                (Vec3::new(v[0], v[1], v[2]), Vec3::new(v[3], v[4], v[5]))
            } else {
                let v = reader.read_i16_array(6)?;
                let position = Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32) / POSITION_SCALE;
                let rotation = Vec3::new(v[3] as f32, v[4] as f32, v[5] as f32)
                    * (std::f32::consts::TAU / ROTATION_UNITS_PER_TURN);
                (position, rotation)
            };
            pose.positions.push(position);
            pose.rotations.push(Vec3::new(rotation.y, rotation.x, rotation.z));
        }
        Ok(())
    }

    /// Add or extend a joint's samples
    pub fn push(&mut self, joint: usize, position: Vec3, rotation: Vec3) {
        let pose = self.joints.entry(joint).or_default();
        pose.positions.push(position);
        pose.rotations.push(rotation);
    }

    /// Longest joint sample count
    pub fn frame_count(&self) -> usize {
        self.joints
            .values()
            .map(JointPose::frame_count)
            .max()
            .unwrap_or(0)
    }

    pub fn joint(&self, joint: usize) -> Option<&JointPose> {
        self.joints.get(&joint)
    }

    pub fn joints(&self) -> impl Iterator<Item = (usize, &JointPose)> {
        self.joints.iter().map(|(&joint, pose)| (joint, pose))
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(joint: u8, is_float: bool, samples: &[[f32; 6]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(samples.len() as u16).to_le_bytes());
        data.push(joint);
        data.push(u8::from(is_float));
        for sample in samples {
            for &v in sample {
                if is_float {
                    data.extend_from_slice(&v.to_le_bytes());
                } else {
                    data.extend_from_slice(&(v as i16).to_le_bytes());
                }
            }
        }
        data
    }

    fn track(blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut data = (blocks.len() as u32).to_le_bytes().to_vec();
        let mut offset = 4 + 4 * blocks.len();
        for b in blocks {
            data.extend_from_slice(&(offset as u32).to_le_bytes());
            offset += b.len();
        }
        for b in blocks {
            data.extend_from_slice(b);
        }
        data
    }

    #[test]
    fn test_fixed_point_samples_are_scaled_and_reordered() {
        let data = track(&[block(2, false, &[[4096.0, -2048.0, 0.0, 6400.0, 0.0, -12800.0]])]);
        let track = PoseTrack::parse(&data).unwrap();
        let pose = track.joint(2).unwrap();

        assert_eq!(pose.positions[0], Vec3::new(1.0, -0.5, 0.0));
        // 6400 units is a quarter turn on X, moved into the Y slot
        let rotation = pose.rotations[0];
        assert!(rotation.x.abs() < 1e-6);
        assert!((rotation.y - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((rotation.z + std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_float_samples_are_reordered_only() {
        let data = track(&[block(0, true, &[[0.5, 1.5, 2.5, 0.1, 0.2, 0.3]])]);
        let track = PoseTrack::parse(&data).unwrap();
        let pose = track.joint(0).unwrap();
        assert_eq!(pose.positions[0], Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(pose.rotations[0], Vec3::new(0.2, 0.1, 0.3));
    }

    #[test]
    fn test_blocks_for_same_joint_append() {
        let data = track(&[
            block(1, true, &[[0.0; 6]; 3]),
            block(4, true, &[[0.0; 6]; 2]),
            block(1, false, &[[0.0; 6]; 2]),
        ]);
        let track = PoseTrack::parse(&data).unwrap();
        assert_eq!(track.joint(1).unwrap().frame_count(), 5);
        assert_eq!(track.frame_count(), 5);
        assert_eq!(track.joints().count(), 2);
    }

    #[test]
    fn test_truncated_block_fails() {
        let mut data = track(&[block(0, true, &[[0.0; 6]; 2])]);
        data.truncate(data.len() - 1);
        assert!(matches!(PoseTrack::parse(&data), Err(AnimError::Pm2(e)) if e.is_truncated()));
    }

    #[test]
    fn test_offset_past_end_is_invalid() {
        let mut data = 1u32.to_le_bytes().to_vec();
        data.extend_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            PoseTrack::parse(&data),
            Err(AnimError::InvalidPoseTrack(_))
        ));
    }
}
