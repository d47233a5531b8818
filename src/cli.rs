use std::{f32::consts::PI, path::PathBuf, time::Instant};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use instanced_bvh::{
    BuildSettings, Bvh, GpuBuffers, InstanceTransforms, Mesh, SplitStrategy,
    geometry::{Transform, WorldVector},
};
use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};

/// Builds a BVH over instances of a mesh and prints its statistics.
#[derive(Parser)]
#[command(name = "bvh-stats")]
struct Args {
    /// Number of mesh instances
    #[arg(long, default_value_t = 2)]
    instances: usize,

    /// Wavefront OBJ file to instance, unit cube if not given
    #[arg(long)]
    obj: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Strategy::Binned)]
    strategy: Strategy,

    /// Steps or bins per axis of the SAH strategies
    #[arg(long, default_value_t = 3)]
    sah_step: usize,

    /// Leaf size threshold of the dichotomy strategy
    #[arg(long, default_value_t = 2)]
    triangles_per_leaf: usize,

    /// Distance between instances along x
    #[arg(long, default_value_t = 2.0)]
    spacing: f32,

    /// Maximal random offset of each instance along every axis
    #[arg(long, default_value_t = 0.0)]
    jitter: f32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of animated frames that only refit the tree
    #[arg(long, default_value_t = 0)]
    frames: usize,

    #[arg(long)]
    print_tree: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Strategy {
    Dichotomy,
    Exhaustive,
    Stepped,
    Binned,
}

impl From<Strategy> for SplitStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Dichotomy => SplitStrategy::Dichotomy,
            Strategy::Exhaustive => SplitStrategy::ExhaustiveSah,
            Strategy::Stepped => SplitStrategy::SteppedSah,
            Strategy::Binned => SplitStrategy::BinnedSah,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mesh = match &args.obj {
        Some(path) => Mesh::with_obj(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Mesh::unit_cube(),
    };

    let settings = BuildSettings::builder()
        .strategy(args.strategy.into())
        .sah_step(args.sah_step)
        .triangles_per_leaf(args.triangles_per_leaf)
        .build();
    settings.validate()?;

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let offsets: Vec<WorldVector> = (0..args.instances)
        .map(|i| {
            let jitter = WorldVector::from_fn(|_, _| rng.random_range(-1.0..=1.0) * args.jitter);
            WorldVector::new(i as f32 * args.spacing, 0.0, 0.0) + jitter
        })
        .collect();
    let transforms = |angle: f32| -> Vec<Transform> {
        offsets
            .iter()
            .map(|offset| {
                Transform::new_translation(offset)
                    * Transform::new_rotation(WorldVector::y() * angle)
            })
            .collect()
    };

    let mut bvh = Bvh::with_capacity(args.instances * mesh.triangle_count());
    let start = Instant::now();
    bvh.rebuild(
        args.instances,
        &mesh,
        InstanceTransforms::PerInstance(&transforms(0.0)),
        &settings,
    );
    log::info!(
        "Built {:?} BVH over {} triangles in {:?}",
        settings.strategy,
        bvh.triangle_count(),
        start.elapsed()
    );

    if args.print_tree {
        bvh.print_tree();
    }
    bvh.print_statistics();

    if args.frames > 0 {
        let bar = ProgressBar::new(args.frames as u64);
        let mut buffers = GpuBuffers::default();

        let start = Instant::now();
        for frame in 1..=args.frames {
            let angle = 2.0 * PI * frame as f32 / args.frames as f32;
            bvh.update(
                args.instances,
                &mesh,
                InstanceTransforms::PerInstance(&transforms(angle)),
            );
            bvh.write_gpu_buffers(&mut buffers);
            bar.inc(1);
        }
        bar.finish();

        log::info!(
            "Refitted {} frames, {:?} per frame",
            args.frames,
            start.elapsed() / args.frames as u32
        );
        log::info!(
            "GPU buffers: {} + {} + {} bytes",
            buffers.bounds_bytes().len(),
            buffers.links_bytes().len(),
            buffers.triangle_indices_bytes().len()
        );
    }

    Ok(())
}
