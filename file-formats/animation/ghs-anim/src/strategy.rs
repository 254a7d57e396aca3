//! Scheduling of multiple clips onto output tracks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How clips are laid out relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStrategy {
    /// One track; each clip starts one frame after the previous one ends
    #[default]
    SequentialConcat,
    /// One track; each clip starts at the next multiple of 100
    PaddedConcat,
    /// One track per clip, all sharing the same slots
    ParallelTracks,
    /// One track per clip, each with its own copy of every slot
    ReplicaPerClip,
}

impl ScheduleStrategy {
    pub const ALL: [Self; 4] = [
        Self::SequentialConcat,
        Self::PaddedConcat,
        Self::ParallelTracks,
        Self::ReplicaPerClip,
    ];

    /// True when all clips are laid end to end on a single track
    pub fn is_concat(self) -> bool {
        matches!(self, Self::SequentialConcat | Self::PaddedConcat)
    }

    /// Start frame of the clip after one starting at `offset` with `length` frames
    ///
    /// Returns `None` when the frame does not fit in an `i32`.
    ///
    /// ```
    /// use ghs_anim::ScheduleStrategy;
    ///
    /// assert_eq!(ScheduleStrategy::SequentialConcat.next_offset(0, 10), Some(11));
    /// assert_eq!(ScheduleStrategy::PaddedConcat.next_offset(0, 37), Some(100));
    /// assert_eq!(ScheduleStrategy::ParallelTracks.next_offset(0, 37), Some(0));
    /// assert_eq!(ScheduleStrategy::SequentialConcat.next_offset(0, i32::MAX), None);
    /// ```
    pub fn next_offset(self, offset: i32, length: i32) -> Option<i32> {
        match self {
            Self::SequentialConcat => offset.checked_add(length)?.checked_add(1),
            Self::PaddedConcat => offset
                .checked_add(length)?
                .checked_add(100)?
                .div_euclid(100)
                .checked_mul(100),
            Self::ParallelTracks | Self::ReplicaPerClip => Some(0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SequentialConcat => "sequential-concat",
            Self::PaddedConcat => "padded-concat",
            Self::ParallelTracks => "parallel-tracks",
            Self::ReplicaPerClip => "replica-per-clip",
        }
    }
}

impl fmt::Display for ScheduleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("unknown schedule strategy '{}'", s))
    }
}

/// Where blend weights for morph submodels are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendWeightMode {
    /// A weight curve per submodel slot
    #[default]
    Direct,
    /// A location channel on a carrier joint under the slot
    CarrierChannel,
}

impl BlendWeightMode {
    pub const ALL: [Self; 2] = [Self::Direct, Self::CarrierChannel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::CarrierChannel => "carrier-channel",
        }
    }
}

impl fmt::Display for BlendWeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendWeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown blend weight mode '{}'", s))
    }
}

/// Settings for one compilation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileOptions {
    pub strategy: ScheduleStrategy,
    pub blend_weights: BlendWeightMode,
}

impl CompileOptions {
    pub fn new(strategy: ScheduleStrategy, blend_weights: BlendWeightMode) -> Self {
        Self {
            strategy,
            blend_weights,
        }
    }

    /// The usual pairing: carrier channels for parallel tracks, direct curves otherwise
    pub fn for_strategy(strategy: ScheduleStrategy) -> Self {
        let blend_weights = if strategy == ScheduleStrategy::ParallelTracks {
            BlendWeightMode::CarrierChannel
        } else {
            BlendWeightMode::Direct
        };
        Self::new(strategy, blend_weights)
    }
}
