//! Triangle strip expansion and flat mesh buffers

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::model::{Model, Primitive};

impl Primitive {
    /// Expand the strip into triangles of local vertex indices
    ///
    /// Even triangles are emitted as `(i+1, i, i+2)` and odd ones as
    /// `(i, i+1, i+2)`, which flips the strip's native winding so every
    /// face ends up oriented the same way.
    ///
    /// ```
    /// use ghs_pm2::{Primitive, Vertex};
    ///
    /// let strip = Primitive::new(vec![Vertex::default(); 4]);
    /// assert_eq!(strip.triangles(), vec![[1, 0, 2], [1, 2, 3]]);
    /// ```
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        (0..self.vertices.len().saturating_sub(2) as u32)
            .map(|i| {
                if i % 2 == 0 {
                    [i + 1, i, i + 2]
                } else {
                    [i, i + 1, i + 2]
                }
            })
            .collect()
    }
}

/// Flattened vertex and index buffers for a whole model
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub texcoords: Vec<[f32; 2]>,
    /// Present only for animated models
    pub position_deltas: Option<Vec<[f32; 3]>>,
    pub normal_deltas: Option<Vec<[f32; 3]>>,
    /// Indices into the vertex arrays
    pub triangles: Vec<[u32; 3]>,
    /// Index of the source group for each triangle
    pub triangle_groups: Vec<usize>,
}

impl MeshBuffers {
    pub fn from_model(model: &Model) -> Self {
        let vertex_count = model.vertex_count();
        let mut buffers = Self {
            positions: Vec::with_capacity(vertex_count),
            normals: Vec::with_capacity(vertex_count),
            colors: Vec::with_capacity(vertex_count),
            texcoords: Vec::with_capacity(vertex_count),
            position_deltas: model.animated().then(|| Vec::with_capacity(vertex_count)),
            normal_deltas: model.animated().then(|| Vec::with_capacity(vertex_count)),
            triangles: Vec::with_capacity(model.triangle_count()),
            triangle_groups: Vec::with_capacity(model.triangle_count()),
        };

        for (group_index, group) in model.groups.iter().enumerate() {
            for primitive in &group.primitives {
                let base = buffers.positions.len() as u32;
                for vertex in &primitive.vertices {
                    buffers.positions.push(vertex.position);
                    buffers.normals.push(vertex.normal);
                    buffers.colors.push(vertex.color);
                    buffers.texcoords.push(vertex.texcoord);
                    if let Some(deltas) = buffers.position_deltas.as_mut() {
                        deltas.push(vertex.position_delta.unwrap_or_default());
                    }
                    if let Some(deltas) = buffers.normal_deltas.as_mut() {
                        deltas.push(vertex.normal_delta.unwrap_or_default());
                    }
                }
                for [a, b, c] in primitive.triangles() {
                    buffers.triangles.push([base + a, base + b, base + c]);
                    buffers.triangle_groups.push(group_index);
                }
            }
        }

        buffers
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelType, PrimitiveGroup, Vertex};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_strips_have_no_triangles() {
        assert!(Primitive::new(vec![Vertex::default(); 2]).triangles().is_empty());
        assert!(Primitive::default().triangles().is_empty());
    }

    #[test]
    fn test_five_vertex_strip_alternates_winding() {
        let strip = Primitive::new(vec![Vertex::default(); 5]);
        assert_eq!(strip.triangles(), vec![[1, 0, 2], [1, 2, 3], [3, 2, 4]]);
    }

    #[test]
    fn test_buffers_offset_indices_across_primitives() {
        let group = |n: usize| PrimitiveGroup {
            primitives: vec![Primitive::new(vec![Vertex::default(); n])],
            ..Default::default()
        };
        let model = Model {
            model_type: ModelType::Float32,
            groups: vec![group(3), group(4)],
        };

        let buffers = MeshBuffers::from_model(&model);
        assert_eq!(buffers.vertex_count(), 7);
        assert_eq!(buffers.triangles, vec![[1, 0, 2], [4, 3, 5], [4, 5, 6]]);
        assert_eq!(buffers.triangle_groups, vec![0, 1, 1]);
        assert!(buffers.position_deltas.is_none());
    }
}
