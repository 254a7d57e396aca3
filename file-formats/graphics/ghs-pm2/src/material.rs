//! Material sharing keys derived from primitive groups

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{Model, PrimitiveGroup};

/// Vertex alpha at or above this value counts as opaque
pub const ALPHA_OPAQUE_CUTOFF: f32 = 126.0 / 128.0;

/// How a material composites against the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BlendMode {
    Opaque,
    Blend,
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque => write!(f, "opaque"),
            Self::Blend => write!(f, "blend"),
        }
    }
}

/// Groups with equal keys can share one material
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialKey {
    /// Low three hex digits of the group's texture offset
    pub texture_hint: String,
    pub double_sided: bool,
    pub blend: BlendMode,
}

impl MaterialKey {
    pub fn for_group(group: &PrimitiveGroup) -> Self {
        let translucent = group.vertices().any(|v| v.color[3] < ALPHA_OPAQUE_CUTOFF);
        Self {
            texture_hint: group.texture_hint(),
            double_sided: group.double_sided,
            blend: if translucent {
                BlendMode::Blend
            } else {
                BlendMode::Opaque
            },
        }
    }

    /// Name suffix in the form `0x{hint}_{ds|bc}_{blend}`
    pub fn name_suffix(&self) -> String {
        let sides = if self.double_sided { "ds" } else { "bc" };
        format!("0x{}_{}_{}", self.texture_hint, sides, self.blend)
    }
}

impl Model {
    /// Distinct material keys in first-seen group order
    pub fn material_keys(&self) -> Vec<MaterialKey> {
        let mut keys: Vec<MaterialKey> = Vec::new();
        for key in self.groups.iter().map(MaterialKey::for_group) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Index into [`Model::material_keys`] for every group
    pub fn group_material_indices(&self) -> Vec<usize> {
        let keys = self.material_keys();
        self.groups
            .iter()
            .map(|group| {
                let key = MaterialKey::for_group(group);
                keys.iter().position(|k| *k == key).unwrap_or_default()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelType, Primitive, Vertex};

    fn group(texture_offset: u16, alpha: f32) -> PrimitiveGroup {
        PrimitiveGroup {
            texture_offset,
            double_sided: false,
            primitives: vec![Primitive::new(vec![
                Vertex {
                    color: [1.0, 1.0, 1.0, alpha],
                    ..Default::default()
                };
                3
            ])],
        }
    }

    #[test]
    fn test_alpha_cutoff() {
        assert_eq!(MaterialKey::for_group(&group(0, 1.0)).blend, BlendMode::Opaque);
        assert_eq!(
            MaterialKey::for_group(&group(0, 126.0 / 128.0)).blend,
            BlendMode::Opaque
        );
        assert_eq!(
            MaterialKey::for_group(&group(0, 125.0 / 128.0)).blend,
            BlendMode::Blend
        );
    }

    #[test]
    fn test_keys_deduplicate_by_truncated_hint() {
        let model = Model {
            model_type: ModelType::Float32,
            groups: vec![group(0x1234, 1.0), group(0x5678, 1.0), group(0x0234, 1.0)],
        };

        let keys = model.material_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name_suffix(), "0x234_bc_opaque");
        assert_eq!(model.group_material_indices(), vec![0, 1, 0]);
    }
}
