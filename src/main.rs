use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use spherepack::config::RunConfig;
use spherepack::driver::{build_simulation, compress, CompressionTarget};
use spherepack::io::{StatisticsWriter, SummaryWriter};

/// spherepack - growing hard-sphere packings by event-driven molecular dynamics
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of spheres (overrides config file)
    #[arg(short = 'n', long, value_name = "COUNT")]
    spheres: Option<usize>,

    /// Spatial dimension, 2 to 6 (overrides config file)
    #[arg(short = 'd', long, value_name = "DIM")]
    dim: Option<usize>,

    /// Random seed for placement and velocities
    #[arg(short = 's', long, value_name = "SEED")]
    seed: Option<u64>,

    /// Directory for configuration, statistics and summary files
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Radius growth rate (overrides config file)
    #[arg(short = 'g', long, value_name = "RATE")]
    growth_rate: Option<f64>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(n) = self.spheres {
            config.n = n;
        }
        if let Some(dim) = self.dim {
            config.dim = dim;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(rate) = self.growth_rate {
            config.growth_rate = rate;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let print_config = args.print_config;
    let config = args.into_config()?;
    if print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    match config.dim {
        2 => run::<2>(&config),
        3 => run::<3>(&config),
        4 => run::<4>(&config),
        5 => run::<5>(&config),
        6 => run::<6>(&config),
        d => bail!("unsupported dimension {d}"),
    }
}

/// One independent compression per target packing fraction.
fn run<const D: usize>(config: &RunConfig) -> anyhow::Result<()> {
    let dir = &config.output_dir;
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut summary = SummaryWriter::create(dir.join("summary.txt"))?;

    for (index, &max_pf) in config.max_packing_fractions.iter().enumerate() {
        info!("run {index}: {D}D, N={}, target packing fraction {max_pf}", config.n);
        let run_config = RunConfig {
            seed: config.seed.map(|s| s.wrapping_add(index as u64)),
            ..config.clone()
        };
        let mut sim = build_simulation::<D>(&run_config, max_pf)
            .with_context(|| format!("setting up run {index}"))?;

        let mut stats = StatisticsWriter::create(dir.join(format!("statis_{index}.dat")))?;
        let target = CompressionTarget::from_config(&run_config, max_pf);
        let last = compress(&mut sim, &target, |cycle, s| stats.record(cycle, s))
            .with_context(|| format!("compressing run {index}"))?;
        stats.flush()?;

        let name = format!("struct_{index}.dat");
        sim.write_configuration(dir.join(&name))
            .with_context(|| format!("writing {name}"))?;
        summary.record(&name, sim.num_spheres(), sim.radius(), sim.packing_fraction())?;
        info!(
            "run {index} done: pf={:.6} pressure={:.4} energy change={:.3e}% -> {name}",
            sim.packing_fraction(),
            last.pressure,
            last.energy_change
        );
    }
    Ok(())
}
