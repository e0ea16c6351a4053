// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line scenarios: run, verify, torture and inspect.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use broadphase_geom::broad::verify::{verify_pair_set, verify_rebuild_determinism};
use broadphase_geom::narrow::ClassifiedPair;
use broadphase_geom::{
    BroadPhaseMode, BvhNode, BvhNodeKind, CollisionPipeline, FrameStats, Pair, PairClass,
    PipelineConfig, QueryTrace, Shape,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigService, FsConfigStore, ScenarioPrefs, SCENARIO_KEY};
use crate::sim::SceneWorld;

/// Domain tag mixed into every frame digest.
const FRAME_DOMAIN: &[u8] = b"BROADPHASE_FRAME_V1";

/// Top-level command line.
#[derive(Parser)]
#[command(name = "broadphase")]
#[command(about = "Drive the BVH broad phase over seeded bouncing-shape scenes")]
pub struct Cli {
    /// Ignore and never write the stored scenario preferences
    #[arg(long, global = true)]
    pub no_config: bool,
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides applied on top of the stored preferences.
#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioArgs {
    /// Number of live shapes
    #[arg(long, global = true)]
    pub shapes: Option<usize>,
    /// Scene seed
    #[arg(long, global = true)]
    pub seed: Option<u64>,
    /// Broad-phase candidate source
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,
    /// Simulation speed multiplier
    #[arg(long, global = true)]
    pub speed: Option<f32>,
    /// Also run brute force every tick and report mismatches
    #[arg(long, global = true)]
    pub compare: bool,
}

/// CLI spelling of [`BroadPhaseMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Dual-tree BVH self-query
    Bvh,
    /// All-pairs comparison
    Brute,
}

impl From<ModeArg> for BroadPhaseMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Bvh => Self::Bvh,
            ModeArg::Brute => Self::BruteForce,
        }
    }
}

/// Harness subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate a scenario and print a summary
    Run {
        /// Number of ticks to simulate
        #[arg(long, default_value = "600")]
        ticks: u32,
        /// Persist the resolved preferences as the new defaults
        #[arg(long)]
        save: bool,
    },
    /// Check BVH pairs against brute force on every tick
    Verify {
        /// Number of ticks to simulate
        #[arg(long, default_value = "600")]
        ticks: u32,
    },
    /// Run a scenario repeatedly to detect non-determinism
    Torture {
        /// Number of ticks per run
        #[arg(long, default_value = "300")]
        ticks: u32,
        /// Number of runs
        #[arg(long, default_value = "20")]
        runs: u32,
    },
    /// Advance to a tick and export its collision frame as JSON
    Inspect {
        /// Tick to stop at
        #[arg(long, default_value = "1")]
        tick: u32,
        /// Shape whose single-shape query is recorded
        #[arg(long)]
        trace: Option<usize>,
        /// Output path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Applies CLI overrides on top of `base`.
pub fn apply_overrides(base: ScenarioPrefs, args: &ScenarioArgs) -> ScenarioPrefs {
    ScenarioPrefs {
        shape_count: args.shapes.unwrap_or(base.shape_count),
        seed: args.seed.unwrap_or(base.seed),
        mode: args.mode.map_or(base.mode, BroadPhaseMode::from),
        speed_mult: args.speed.unwrap_or(base.speed_mult),
        compare_brute_force: args.compare || base.compare_brute_force,
        ..base
    }
}

/// A scene plus the pipeline consuming it.
pub struct Scenario {
    prefs: ScenarioPrefs,
    world: SceneWorld,
    pipeline: CollisionPipeline,
    shapes: Vec<Shape>,
    tick: u32,
}

impl Scenario {
    /// Builds the scene for `prefs`; `traced_shape` selects a recorded query.
    pub fn new(prefs: ScenarioPrefs, traced_shape: Option<usize>) -> Self {
        let world = SceneWorld::new(prefs.seed, prefs.world_width, prefs.world_height);
        let pipeline = CollisionPipeline::new(PipelineConfig {
            mode: prefs.mode,
            compare_brute_force: prefs.compare_brute_force,
            aabb_margin: 0.0,
            traced_shape,
        });
        Self {
            prefs,
            world,
            pipeline,
            shapes: Vec::new(),
            tick: 0,
        }
    }

    /// Tops up the scene, integrates one tick and runs the collision pass.
    pub fn advance(&mut self) -> FrameStats {
        self.world.ensure_count(self.prefs.shape_count);
        self.world.update(self.prefs.dt, self.prefs.speed_mult);
        self.shapes = self.world.shapes();
        self.tick += 1;
        *self.pipeline.step(&self.shapes)
    }

    /// Ticks advanced so far.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Pipeline state after the last tick.
    pub fn pipeline(&self) -> &CollisionPipeline {
        &self.pipeline
    }

    /// Shapes fed to the last tick.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

/// Hashes the last frame of `pipeline`, chained onto `prev`.
///
/// Covers the node array bit for bit and the classified candidate list.
pub fn frame_digest(prev: &[u8; 32], pipeline: &CollisionPipeline) -> [u8; 32] {
    let mut h = blake3::Hasher::new();
    h.update(FRAME_DOMAIN);
    h.update(prev);

    let nodes = pipeline.bvh().nodes();
    h.update(&(nodes.len() as u64).to_le_bytes());
    for node in nodes {
        let b = node.bounds();
        for v in [b.min().x(), b.min().y(), b.max().x(), b.max().y()] {
            h.update(&v.to_bits().to_le_bytes());
        }
        match node.kind() {
            BvhNodeKind::Leaf { shape_index } => {
                h.update(&[0]);
                h.update(&(shape_index as u64).to_le_bytes());
            }
            BvhNodeKind::Internal { left, right } => {
                h.update(&[1]);
                h.update(&(left as u64).to_le_bytes());
                h.update(&(right as u64).to_le_bytes());
            }
        }
        h.update(&(node.depth() as u64).to_le_bytes());
    }

    let classified = pipeline.narrow().pairs();
    h.update(&(classified.len() as u64).to_le_bytes());
    for c in classified {
        h.update(&(c.pair.0 as u64).to_le_bytes());
        h.update(&(c.pair.1 as u64).to_le_bytes());
        h.update(&[u8::from(c.class == PairClass::Confirmed)]);
    }
    *h.finalize().as_bytes()
}

/// Aggregates over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u32,
    /// Candidates summed over all ticks.
    pub broad_phase_pairs: u64,
    /// Confirmed collisions summed over all ticks.
    pub actual_collisions: u64,
    /// False positives summed over all ticks.
    pub false_positives: u64,
    /// Deepest tree seen.
    pub max_bvh_depth: usize,
    /// Ticks whose BVH and brute-force pair sets differed.
    pub mismatch_ticks: u32,
    /// Hex digest chain, one entry per tick.
    pub digests: Vec<String>,
}

/// Simulates `ticks` ticks and folds the per-tick stats.
pub fn run_scenario(prefs: &ScenarioPrefs, ticks: u32) -> RunSummary {
    let mut scenario = Scenario::new(prefs.clone(), None);
    let mut summary = RunSummary::default();
    let mut chain = [0u8; 32];
    for _ in 0..ticks {
        let stats = scenario.advance();
        chain = frame_digest(&chain, scenario.pipeline());
        summary.ticks += 1;
        summary.broad_phase_pairs += stats.broad_phase_pairs as u64;
        summary.actual_collisions += stats.actual_collisions as u64;
        summary.false_positives += stats.false_positives as u64;
        summary.max_bvh_depth = summary.max_bvh_depth.max(stats.bvh_max_depth);
        summary.mismatch_ticks += u32::from(stats.bvh_mismatch);
        summary.digests.push(hex::encode(chain));
    }
    debug!(ticks, digest = summary.digests.last().map_or("", String::as_str), "run finished");
    summary
}

/// Checks BVH exactness and rebuild determinism on every tick.
///
/// # Errors
/// Fails on the first tick whose BVH pair set differs from brute force or
/// whose tree does not rebuild identically.
pub fn verify_scenario(prefs: &ScenarioPrefs, ticks: u32) -> Result<u32> {
    let prefs = ScenarioPrefs {
        mode: BroadPhaseMode::Bvh,
        compare_brute_force: true,
        ..prefs.clone()
    };
    let mut scenario = Scenario::new(prefs, None);
    for _ in 0..ticks {
        scenario.advance();
        let tick = scenario.tick();
        let pipeline = scenario.pipeline();
        let Some(oracle) = pipeline.brute_pairs() else {
            bail!("tick {tick}: brute-force pairs were not computed");
        };
        verify_pair_set(pipeline.broad_pairs(), oracle)
            .with_context(|| format!("tick {tick}: BVH pairs disagree with brute force"))?;
        verify_rebuild_determinism(pipeline.aabbs())
            .with_context(|| format!("tick {tick}: BVH rebuild is not deterministic"))?;
    }
    Ok(ticks)
}

/// Runs the scenario `runs` times and compares digest chains against the first run.
///
/// # Errors
/// Reports the first run and tick whose digest diverged.
pub fn torture(prefs: &ScenarioPrefs, ticks: u32, runs: u32) -> Result<RunSummary> {
    if runs == 0 {
        bail!("torture needs at least one run");
    }
    let baseline = run_scenario(prefs, ticks);
    for run in 2..=runs {
        let current = run_scenario(prefs, ticks);
        if let Some(step) = baseline
            .digests
            .iter()
            .zip(&current.digests)
            .position(|(a, b)| a != b)
        {
            bail!(
                "divergence in run {run} at tick {}.\nBaseline: {}\nCurrent:  {}",
                step + 1,
                baseline.digests[step],
                current.digests[step]
            );
        }
        if current.digests.len() != baseline.digests.len() {
            bail!(
                "divergence in run {run}: baseline has {} ticks, current has {}",
                baseline.digests.len(),
                current.digests.len()
            );
        }
        if run % 10 == 0 {
            info!(run, runs, "torture runs clean so far");
        }
    }
    Ok(baseline)
}

/// JSON export of one collision frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameExport {
    /// Tick the frame was captured at.
    pub tick: u32,
    /// Resolved preferences.
    pub prefs: ScenarioPrefs,
    /// Pipeline counters.
    pub stats: FrameStats,
    /// Shapes in index order.
    pub shapes: Vec<Shape>,
    /// BVH node array, root first.
    pub nodes: Vec<BvhNode>,
    /// Active broad-phase candidates.
    pub broad_pairs: Vec<Pair>,
    /// Brute-force pairs, when computed.
    pub brute_pairs: Option<Vec<Pair>>,
    /// Narrow-phase outcome per candidate.
    pub classified: Vec<ClassifiedPair>,
    /// Recorded single-shape query, when requested.
    pub trace: Option<QueryTrace>,
    /// Hex digest of this frame chained from tick 1.
    pub digest: String,
}

/// Advances to `tick` and captures the frame.
///
/// # Errors
/// Fails when `tick` is zero.
pub fn inspect(prefs: &ScenarioPrefs, tick: u32, traced: Option<usize>) -> Result<FrameExport> {
    if tick == 0 {
        bail!("inspect tick must be at least 1");
    }
    let mut scenario = Scenario::new(prefs.clone(), traced);
    let mut chain = [0u8; 32];
    let mut stats = FrameStats::default();
    for _ in 0..tick {
        stats = scenario.advance();
        chain = frame_digest(&chain, scenario.pipeline());
    }
    if let Some(t) = traced.filter(|&t| t >= scenario.shapes().len()) {
        warn!(traced = t, shapes = scenario.shapes().len(), "traced shape out of range; no trace recorded");
    }

    let p = scenario.pipeline();
    Ok(FrameExport {
        tick,
        prefs: prefs.clone(),
        stats,
        shapes: scenario.shapes().to_vec(),
        nodes: p.bvh().nodes().to_vec(),
        broad_pairs: p.broad_pairs().to_vec(),
        brute_pairs: p.brute_pairs().map(<[Pair]>::to_vec),
        classified: p.narrow().pairs().to_vec(),
        trace: p.trace().cloned(),
        digest: hex::encode(chain),
    })
}

fn resolve_prefs(
    args: &ScenarioArgs,
    no_config: bool,
) -> Result<(ScenarioPrefs, Option<ConfigService<FsConfigStore>>)> {
    if no_config {
        let prefs = apply_overrides(ScenarioPrefs::default(), args);
        prefs.validate().context("invalid scenario settings")?;
        return Ok((prefs, None));
    }
    // Config (best-effort)
    let config = match FsConfigStore::new() {
        Ok(store) => Some(ConfigService::new(store)),
        Err(err) => {
            warn!(error = %err, "config store unavailable; using defaults");
            None
        }
    };
    let stored = config
        .as_ref()
        .map_or_else(ScenarioPrefs::default, ScenarioPrefs::load_or_default);
    let prefs = apply_overrides(stored, args);
    prefs.validate().context("invalid scenario settings")?;
    Ok((prefs, config))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses the command line and runs the selected command.
///
/// # Errors
/// Propagates scenario failures and I/O errors.
pub fn entrypoint() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let (prefs, config) = resolve_prefs(&cli.scenario, cli.no_config)?;
    debug!(?prefs, "resolved scenario");
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Run { ticks, save } => {
            let summary = run_scenario(&prefs, ticks);
            writeln!(
                out,
                "broadphase: {} ticks, {} shapes, {:?} mode",
                summary.ticks, prefs.shape_count, prefs.mode
            )?;
            writeln!(
                out,
                "  candidates {} | collisions {} | false positives {} | max depth {}",
                summary.broad_phase_pairs,
                summary.actual_collisions,
                summary.false_positives,
                summary.max_bvh_depth
            )?;
            if prefs.compare_brute_force {
                writeln!(out, "  mismatched ticks {}", summary.mismatch_ticks)?;
            }
            if let Some(last) = summary.digests.last() {
                writeln!(out, "  final digest {last}")?;
            }
            if save {
                let Some(cfg) = &config else {
                    bail!("--save needs the config store (drop --no-config)");
                };
                cfg.save(SCENARIO_KEY, &prefs).context("failed to save scenario prefs")?;
                writeln!(out, "  saved preferences")?;
            }
            if summary.mismatch_ticks > 0 {
                bail!("{} ticks had BVH/brute-force mismatches", summary.mismatch_ticks);
            }
        }
        Commands::Verify { ticks } => {
            let checked = verify_scenario(&prefs, ticks)?;
            writeln!(out, "broadphase: OK. {checked} ticks verified against brute force.")?;
        }
        Commands::Torture { ticks, runs } => {
            writeln!(out, "broadphase: torture starting. {runs} runs of {ticks} ticks")?;
            let baseline = torture(&prefs, ticks, runs)?;
            writeln!(
                out,
                "broadphase: torture complete. {runs} runs identical ({}).",
                baseline.digests.last().map_or("empty", String::as_str)
            )?;
        }
        Commands::Inspect { tick, trace, out: path } => {
            let frame = inspect(&prefs, tick, trace)?;
            match path {
                Some(path) => {
                    let f = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    serde_json::to_writer_pretty(BufWriter::new(f), &frame)?;
                    writeln!(out, "broadphase: frame {tick} written to {}", path.display())?;
                }
                None => {
                    serde_json::to_writer_pretty(&mut out, &frame)?;
                    writeln!(out)?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ScenarioPrefs {
        ScenarioPrefs {
            shape_count: 40,
            seed: 7,
            ..ScenarioPrefs::default()
        }
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let args = ScenarioArgs {
            shapes: Some(5),
            mode: Some(ModeArg::Brute),
            compare: true,
            ..ScenarioArgs::default()
        };
        let prefs = apply_overrides(ScenarioPrefs::default(), &args);
        assert_eq!(prefs.shape_count, 5);
        assert_eq!(prefs.mode, BroadPhaseMode::BruteForce);
        assert!(prefs.compare_brute_force);
        assert_eq!(prefs.seed, ScenarioPrefs::default().seed);
    }

    #[test]
    fn non_finite_speed_override_is_an_error() {
        let args = ScenarioArgs {
            speed: Some(f32::NAN),
            ..ScenarioArgs::default()
        };
        let err = resolve_prefs(&args, true).unwrap_err();
        assert!(format!("{err:#}").contains("invalid scenario settings"));
        assert!(format!("{err:#}").contains("speed multiplier"));
    }

    #[test]
    fn finite_overrides_resolve_without_config() {
        let args = ScenarioArgs {
            speed: Some(2.5),
            shapes: Some(3),
            ..ScenarioArgs::default()
        };
        let (prefs, config) = resolve_prefs(&args, true).unwrap();
        assert_eq!(prefs.speed_mult, 2.5);
        assert_eq!(prefs.shape_count, 3);
        assert!(config.is_none());
    }

    #[test]
    fn digest_chain_depends_on_previous_frame() {
        let mut scenario = Scenario::new(small(), None);
        scenario.advance();
        let a = frame_digest(&[0; 32], scenario.pipeline());
        let b = frame_digest(&[1; 32], scenario.pipeline());
        assert_ne!(a, b);
        assert_eq!(a, frame_digest(&[0; 32], scenario.pipeline()));
    }

    #[test]
    fn brute_mode_and_bvh_mode_hash_identically() {
        // Same tree, same candidates, same classes: only the source differs.
        let bvh = run_scenario(&small(), 30);
        let brute = run_scenario(
            &ScenarioPrefs {
                mode: BroadPhaseMode::BruteForce,
                ..small()
            },
            30,
        );
        assert_eq!(bvh.digests, brute.digests);
    }

    #[test]
    fn inspect_rejects_tick_zero() {
        assert!(inspect(&small(), 0, None).is_err());
    }

    #[test]
    fn torture_rejects_zero_runs() {
        assert!(torture(&small(), 1, 0).is_err());
    }
}
