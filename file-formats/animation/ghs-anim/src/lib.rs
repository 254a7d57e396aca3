//! Animation support for Gregory Horror Show characters.
//!
//! Characters are a joint hierarchy with a rigid PM2 submodel bound to each
//! joint. Animation swaps submodels in and out by keyframe, blends morph
//! submodels between their two frames, and moves joints from a separate
//! pose track. This crate reads the character description and pose tracks
//! and compiles a clip set into visibility timelines, blend weight curves
//! and pose curves any scene builder can consume.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! use ghs_anim::{CompileOptions, GhsDescription, ScheduleStrategy, compile_clip_set};
//!
//! let ghs = GhsDescription::from_file("chara.ghs")?;
//! let mut models = BTreeMap::new();
//! for (_, id) in ghs.defaults.iter() {
//!     models.insert(id, ghs_pm2::decode_model_file(format!("{:03x}.pm2", id))?);
//! }
//!
//! let compiled = compile_clip_set(
//!     &ghs.rig,
//!     &ghs.defaults,
//!     &ghs.clips,
//!     CompileOptions::for_strategy(ScheduleStrategy::SequentialConcat),
//!     &mut models,
//! )?;
//! for warning in &compiled.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

pub mod compiler;
pub mod curve;
pub mod error;
pub mod loader;
pub mod pose;
pub mod rig;
pub mod strategy;
pub mod timeline;
pub mod warning;

pub use compiler::{
    BlendWeightTarget, CompiledAnimation, CompiledTrack, SlotId, SlotRecord, SlotRole,
    compile_clip_set, compile_rest_pose,
};
pub use curve::{Curve, Interpolation};
pub use error::{AnimError, Result};
pub use loader::SubmodelLoader;
pub use pose::PoseTrack;
pub use rig::{ClipSpec, DefaultBindings, GhsDescription, Joint, Keyframe, Rig};
pub use strategy::{BlendWeightMode, CompileOptions, ScheduleStrategy};
pub use timeline::Timeline;
pub use warning::CompileWarning;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
