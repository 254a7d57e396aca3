//! Decoder for Gregory Horror Show PM2 model files.
//!
//! PM2 files are not self-describing: the geometry is stored as the VIF
//! micro-op stream the PS2 used to upload vertices to VU memory. This crate
//! replays that stream and reads the resulting memory image back as
//! triangle strips.
//!
//! # Examples
//!
//! ```no_run
//! use ghs_pm2::{MeshBuffers, decode_model_file};
//!
//! let model = decode_model_file("012.pm2")?;
//! println!("{} groups, animated: {}", model.groups.len(), model.animated());
//!
//! let mesh = MeshBuffers::from_model(&model);
//! println!("{} triangles", mesh.triangles.len());
//! # Ok::<(), ghs_pm2::Pm2Error>(())
//! ```

#![forbid(unsafe_code)]

mod debug;

pub mod decoder;
pub mod error;
pub mod map;
pub mod material;
pub mod mesh;
pub mod model;
pub mod reader;

pub use decoder::{Pm2Header, decode_model, decode_model_file, decode_model_from};
pub use error::{Pm2Error, Result};
pub use map::{MapContainer, MapEntry};
pub use material::{BlendMode, MaterialKey};
pub use mesh::MeshBuffers;
pub use model::{Model, ModelType, Primitive, PrimitiveGroup, Vertex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
