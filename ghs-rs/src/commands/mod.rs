//! Command implementations for each file format

pub mod map;
pub mod pm2;

#[cfg(feature = "anim")]
pub mod ghs;

#[cfg(feature = "anim")]
pub mod mpr;
