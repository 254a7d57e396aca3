//! Decoded PM2 geometry

use custom_debug::Debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::debug;
use crate::error::{Pm2Error, Result};

/// Model type byte from the PM2 header
///
/// The type selects both the numeric representation of vertex fields in
/// VU memory and whether vertices carry a second morph frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ModelType {
    /// 32-bit float fields
    Float32 = 0x12,
    /// 32-bit float fields with morph deltas
    Float32Animated = 0x13,
    /// 16-bit fixed point fields widened to 32-bit slots
    Fixed16 = 0x32,
    /// 16-bit fixed point fields with morph deltas
    Fixed16Animated = 0x33,
}

impl ModelType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x12 => Ok(Self::Float32),
            0x13 => Ok(Self::Float32Animated),
            0x32 => Ok(Self::Fixed16),
            0x33 => Ok(Self::Fixed16Animated),
            other => Err(Pm2Error::UnknownModelType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for the two types whose vertices carry position and normal deltas
    pub fn is_animated(self) -> bool {
        matches!(self, Self::Float32Animated | Self::Fixed16Animated)
    }

    /// True when vertex fields are stored as integers and need normalization
    pub fn is_fixed_point(self) -> bool {
        matches!(self, Self::Fixed16 | Self::Fixed16Animated)
    }

    /// Number of 32-bit fields per vertex record in VU memory
    pub fn fields_per_vertex(self) -> usize {
        if self.is_animated() { 24 } else { 16 }
    }
}

/// A single decoded vertex
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// RGBA, alpha 1.0 is fully opaque
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
    /// Offset to the second morph frame, animated models only
    pub position_delta: Option<[f32; 3]>,
    pub normal_delta: Option<[f32; 3]>,
}

impl Vertex {
    /// Position at morph weight `weight` (0.0 is the base frame, 1.0 the second frame)
    pub fn morphed_position(&self, weight: f32) -> [f32; 3] {
        match self.position_delta {
            Some(delta) => [
                self.position[0] + delta[0] * weight,
                self.position[1] + delta[1] * weight,
                self.position[2] + delta[2] * weight,
            ],
            None => self.position,
        }
    }
}

/// A triangle strip
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Primitive {
    #[debug(with = debug::trimmed_collection_fmt)]
    pub vertices: Vec<Vertex>,
}

impl Primitive {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Primitives that share one texture
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimitiveGroup {
    /// Texture placement hint from the group header
    #[debug(format = "0x{:04X}")]
    pub texture_offset: u16,
    pub double_sided: bool,
    #[debug(with = debug::trimmed_collection_fmt)]
    pub primitives: Vec<Primitive>,
}

impl PrimitiveGroup {
    /// Low three hex digits of the texture offset, used to match texture files
    ///
    /// ```
    /// use ghs_pm2::PrimitiveGroup;
    ///
    /// let group = PrimitiveGroup { texture_offset: 0x1A2B, ..Default::default() };
    /// assert_eq!(group.texture_hint(), "a2b");
    /// ```
    pub fn texture_hint(&self) -> String {
        format!("{:03x}", self.texture_offset & 0x0FFF)
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(Primitive::len).sum()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.primitives.iter().flat_map(|p| p.vertices.iter())
    }
}

/// A decoded PM2 model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Model {
    pub model_type: ModelType,
    pub groups: Vec<PrimitiveGroup>,
}

impl Model {
    /// True when vertices carry a second morph frame
    pub fn animated(&self) -> bool {
        self.model_type.is_animated()
    }

    pub fn primitive_count(&self) -> usize {
        self.groups.iter().map(|g| g.primitives.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(PrimitiveGroup::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.primitives.iter())
            .map(|p| p.len().saturating_sub(2))
            .sum()
    }

    /// Axis-aligned bounds of the base frame, `None` for a model without vertices
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut vertices = self.groups.iter().flat_map(PrimitiveGroup::vertices);
        let first = vertices.next()?;
        let mut min = first.position;
        let mut max = first.position;
        for vertex in vertices {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex.position[axis]);
                max[axis] = max[axis].max(vertex.position[axis]);
            }
        }
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_codes() {
        assert_eq!(ModelType::from_u8(0x33).unwrap(), ModelType::Fixed16Animated);
        assert!(ModelType::Fixed16Animated.is_animated());
        assert!(ModelType::Fixed16Animated.is_fixed_point());
        assert!(!ModelType::Float32.is_fixed_point());
        assert_eq!(ModelType::Float32.fields_per_vertex(), 16);
        assert_eq!(ModelType::Float32Animated.fields_per_vertex(), 24);
        assert!(matches!(
            ModelType::from_u8(0x22),
            Err(Pm2Error::UnknownModelType(0x22))
        ));
    }

    #[test]
    fn test_morphed_position() {
        let vertex = Vertex {
            position: [1.0, 2.0, 3.0],
            position_delta: Some([2.0, 0.0, -2.0]),
            ..Default::default()
        };
        assert_eq!(vertex.morphed_position(0.5), [2.0, 2.0, 2.0]);

        let rigid = Vertex {
            position: [1.0, 2.0, 3.0],
            ..Default::default()
        };
        assert_eq!(rigid.morphed_position(1.0), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bounds_and_counts() {
        let strip = Primitive::new(vec![
            Vertex {
                position: [-1.0, 0.0, 2.0],
                ..Default::default()
            },
            Vertex {
                position: [3.0, -4.0, 0.0],
                ..Default::default()
            },
            Vertex::default(),
            Vertex::default(),
        ]);
        let model = Model {
            model_type: ModelType::Float32,
            groups: vec![PrimitiveGroup {
                primitives: vec![strip],
                ..Default::default()
            }],
        };

        assert_eq!(model.vertex_count(), 4);
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(
            model.bounds(),
            Some(([-1.0, -4.0, 0.0], [3.0, 0.0, 2.0]))
        );
    }
}
