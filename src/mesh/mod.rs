mod obj;

use std::f32::consts::PI;

use itertools::iproduct;
use thiserror::Error;

use crate::geometry::{FloatType, LocalVertex};

/// Triangle mesh in local space, shared by all instances of a scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    vertices: Vec<LocalVertex>,
    indices: Vec<[u32; 3]>,
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Triangle {triangle} references vertex {index}, but the mesh only has {vertex_count} vertices")]
    VertexIndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

impl Mesh {
    pub fn new(vertices: Vec<LocalVertex>, indices: Vec<[u32; 3]>) -> Result<Mesh, MeshError> {
        for (triangle, vertex_indices) in indices.iter().enumerate() {
            if let Some(&index) = vertex_indices
                .iter()
                .find(|&&i| i as usize >= vertices.len())
            {
                return Err(MeshError::VertexIndexOutOfRange {
                    triangle,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        Ok(Mesh { vertices, indices })
    }

    pub fn vertices(&self) -> &[LocalVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Axis aligned cube with edge length 1, centered at the origin.
    pub fn unit_cube() -> Mesh {
        let vertices = (0..8)
            .map(|i| {
                let coord = |bit: u32| if i & bit == 0 { -0.5 } else { 0.5 };
                LocalVertex::new(coord(1), coord(2), coord(4), 1.0)
            })
            .collect();

        // Vertex i has x from bit 0, y from bit 1 and z from bit 2
        let indices = vec![
            [0, 4, 6],
            [0, 6, 2], // -x
            [1, 3, 7],
            [1, 7, 5], // +x
            [0, 1, 5],
            [0, 5, 4], // -y
            [2, 6, 7],
            [2, 7, 3], // +y
            [0, 2, 3],
            [0, 3, 1], // -z
            [4, 5, 7],
            [4, 7, 6], // +z
        ];

        Mesh { vertices, indices }
    }

    /// Latitude/longitude sphere with diameter 1, centered at the origin.
    /// Panics if stacks < 2 or slices < 3.
    pub fn uv_sphere(stacks: u32, slices: u32) -> Mesh {
        assert!(stacks >= 2);
        assert!(slices >= 3);

        let vertices = iproduct!(0..=stacks, 0..=slices)
            .map(|(i, j)| {
                let theta = PI * (i as FloatType) / (stacks as FloatType);
                let phi = 2.0 * PI * (j as FloatType) / (slices as FloatType);
                LocalVertex::new(
                    0.5 * theta.sin() * phi.cos(),
                    0.5 * theta.cos(),
                    0.5 * theta.sin() * phi.sin(),
                    1.0,
                )
            })
            .collect();

        let mut indices = Vec::with_capacity((2 * slices * (stacks - 1)) as usize);
        for (i, j) in iproduct!(0..stacks, 0..slices) {
            let a = i * (slices + 1) + j;
            let b = a + slices + 1;
            // Pole rows only get one triangle per quad, the other one would be degenerate
            if i != 0 {
                indices.push([a, b, a + 1]);
            }
            if i != stacks - 1 {
                indices.push([a + 1, b, b + 1]);
            }
        }

        Mesh { vertices, indices }
    }
}
