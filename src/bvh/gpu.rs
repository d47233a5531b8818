//! Flat buffers in the layout read by the GPU traversal shader.

use bytemuck::{Pod, Zeroable};

use crate::geometry::WorldBox;

use super::{Bvh, NodeLinks};

/// Node bounds as a pair of float4, w is always zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 4],
    pub max: [f32; 4],
}

impl From<&WorldBox> for GpuAabb {
    fn from(b: &WorldBox) -> Self {
        GpuAabb {
            min: [b.min.x, b.min.y, b.min.z, 0.0],
            max: [b.max.x, b.max.y, b.max.z, 0.0],
        }
    }
}

/// One permutation entry, padded to a full int4 for constant buffer packing.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuTriangleIndex {
    pub id: i32,
    pub _padding: [i32; 3],
}

/// Upload ready copies of the node and permutation arrays, sized to the full capacity of the
/// tree so that the GPU side allocation never has to change between frames.
#[derive(Clone, Debug, Default)]
pub struct GpuBuffers {
    pub bounds: Vec<GpuAabb>,
    pub links: Vec<NodeLinks>,
    pub triangle_indices: Vec<GpuTriangleIndex>,
}

impl GpuBuffers {
    pub fn bounds_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.bounds)
    }

    pub fn links_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.links)
    }

    pub fn triangle_indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_indices)
    }
}

impl Bvh {
    /// Copies the tree into the buffers, reusing their allocations.
    /// Slots past the used nodes and active triangles are zeroed.
    pub fn write_gpu_buffers(&self, buffers: &mut GpuBuffers) {
        buffers.bounds.clear();
        buffers.bounds.extend(self.bounds().iter().map(GpuAabb::from));
        buffers.bounds.resize(self.node_capacity(), GpuAabb::zeroed());

        buffers.links.clear();
        buffers.links.extend_from_slice(self.links());
        buffers.links.resize(self.node_capacity(), NodeLinks::zeroed());

        buffers.triangle_indices.clear();
        buffers.triangle_indices.extend(self.triangle_indices().iter().map(|id| GpuTriangleIndex {
            id: id.raw() as i32,
            _padding: [0; 3],
        }));
        buffers
            .triangle_indices
            .resize(self.triangle_capacity(), GpuTriangleIndex::zeroed());
    }

    pub fn gpu_buffers(&self) -> GpuBuffers {
        let mut buffers = GpuBuffers::default();
        self.write_gpu_buffers(&mut buffers);
        buffers
    }
}
