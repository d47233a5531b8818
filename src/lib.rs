pub mod bvh;
pub mod geometry;
pub mod mesh;
mod util;

pub use bvh::{
    BuildSettings, BuildStatistics, Bvh, GpuBuffers, Hit, InstanceTransforms, SettingsError,
    SplitStrategy,
};
pub use mesh::{Mesh, MeshError};
pub use util::Stats;
