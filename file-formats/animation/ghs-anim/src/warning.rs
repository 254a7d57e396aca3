//! Non-fatal problems collected during compilation

use serde::Serialize;
use thiserror::Error;

use crate::rig::{JointId, SubmodelId};

/// A problem that was worked around; the compiled result is still usable
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CompileWarning {
    /// Keyframe used an interpolation code other than -1, 0, 1 or 2; treated as constant 0
    #[error("clip {clip} joint {joint} keyframe {keyframe}: unknown interpolation type {interp_type}")]
    UnknownInterpolationType {
        clip: usize,
        joint: JointId,
        keyframe: usize,
        interp_type: i32,
    },

    /// The loader has no model for a referenced submodel
    #[error("submodel {submodel:03x} not found")]
    MissingAsset { submodel: SubmodelId },

    /// The loader found the submodel but could not decode it
    #[error("submodel {submodel:03x} failed to decode: {message}")]
    SubmodelDecodeFailed { submodel: SubmodelId, message: String },

    /// Negative ids are reserved by the game; the submodel is skipped
    #[error("joint {joint}: skipping negative submodel {submodel}")]
    NegativeSubmodel { joint: JointId, submodel: SubmodelId },

    /// Pose track names a joint the rig does not have
    #[error("clip {clip}: pose track keys unknown joint {joint}")]
    UnknownPoseJoint { clip: usize, joint: JointId },
}
