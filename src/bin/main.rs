use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anstream::println;
use clap::Parser;
use hrsw::Stopwatch;
use human_duration::human_duration;
use indoc::writedoc;
use owo_colors::OwoColorize;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

use route_planner::algorithms::astar::RoutePlanner;
use route_planner::algorithms::astar::SearchOutcome;
use route_planner::config::ExpansionPolicy;
use route_planner::config::PlannerConfig;
use route_planner::model::RouteModel;
use route_planner::model::generate::GridNetworkConfig;
use route_planner::model::generate::grid;

#[cfg(feature = "mem_profile")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;
#[cfg(not(feature = "mem_profile"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(long_version = route_planner::build::CLAP_LONG_VERSION)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, env = "LOGS_ROUTE", default_value = "logs/route.org")]
    pub output: PathBuf,

    /// Seed of the synthetic road network.
    #[arg(long, env = "ROUTE_SEED", default_value_t = 0u64)]
    pub seed: u64,
    #[arg(long, default_value_t = 64usize)]
    pub width: usize,
    #[arg(long, default_value_t = 64usize)]
    pub height: usize,
    /// Metres spanned by the whole network.
    #[arg(long, default_value_t = 5_000f32)]
    pub metric_scale: f32,

    /// Start, as percentages of the network extent.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [10f32, 10f32])]
    pub start: Vec<f32>,
    /// End, as percentages of the network extent.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], default_values_t = [90f32, 90f32])]
    pub end: Vec<f32>,

    #[arg(long, env = "ROUTE_POLICY", value_enum, default_value_t)]
    pub policy: ExpansionPolicy,

    #[command(flatten)]
    color: colorchoice_clap::Color,
}

fn percent_pair(v: &[f32]) -> (f32, f32) {
    match v {
        [x, y] => (*x, *y),
        _ => (f32::NAN, f32::NAN),
    }
}

fn write_header<W: std::io::Write>(out: &mut BufWriter<W>, args: &Args) -> std::io::Result<()> {
    writeln!(out, ":PROPERTIES:")?;
    writeln!(out, ":VERSION: {:?}", route_planner::build::PKG_VERSION)?;
    writeln!(out, ":GIT_BRANCH: {:?}", shadow_rs::branch())?;
    writeln!(out, ":BUILD_IS_DEBUG: {}", shadow_rs::is_debug())?;
    writeln!(out, ":END:")?;
    writedoc!(
        out,
        "
        #+title: Route planning
        - Seed: {}
        - Grid: {}x{}
        - Policy: {}
        ",
        args.seed,
        args.width,
        args.height,
        args.policy
    )
}

fn plan(
    out: &mut BufWriter<File>,
    model: &mut RouteModel,
    args: &Args,
) -> std::io::Result<()> {
    let start = percent_pair(&args.start);
    let end = percent_pair(&args.end);

    let mut planner = RoutePlanner::new(
        &*model,
        start,
        end,
        PlannerConfig::with_policy(args.policy),
    )
    .map_err(|e| std::io::Error::other(format!("Can't plan a route. {e}")))?;
    writeln!(out, "* Route")?;
    writeln!(
        out,
        "- From {start:?}% ({}) to {end:?}% ({})",
        planner.start(),
        planner.end()
    )?;

    let mut stopwatch = Stopwatch::new_started();
    let outcome = planner.run_search();
    stopwatch.stop();
    let elapsed = stopwatch.elapsed();

    writeln!(out, "- Status: {}", planner.status())?;
    writeln!(out, "- Expanded: {}", planner.expanded())?;
    writeln!(out, "- Discovered: {}", planner.discovered())?;
    writeln!(out, "- Time: {}", human_duration(&elapsed))?;
    writeln!(out, "** Planner\n#+begin_src ron\n{planner:?}\n#+end_src")?;
    planner.write_memory_stats(&mut *out)?;

    match &outcome {
        SearchOutcome::Found(path) => {
            println!(
                "{} {:.1}m over {} nodes in {}",
                "Found".green(),
                path.distance,
                path.len(),
                human_duration(&elapsed).yellow()
            );
            writeln!(out, "** Path\n#+begin_src ron\n{path}\n#+end_src")?;
        }
        SearchOutcome::Exhausted => {
            println!(
                "{} {} and {} are not connected",
                "No route.".red(),
                planner.start(),
                planner.end()
            );
            writeln!(out, "** No route")?;
        }
    }
    planner.print_memory_stats()?;

    model.set_path(outcome.path().cloned());
    Ok(())
}

fn main() -> std::io::Result<()> {
    #[cfg(feature = "coz_profile")]
    coz::thread_init();
    #[cfg(feature = "mem_profile")]
    let _profiler = dhat::Profiler::new_heap();

    let args = Args::parse();
    args.color.write_global();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("Logging to {:?}", args.output.yellow());

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&args.output)?;
    let mut out = BufWriter::new(file);
    write_header(&mut out, &args)?;

    let config = GridNetworkConfig {
        width: args.width,
        height: args.height,
        metric_scale: args.metric_scale,
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut model = grid(&mut rng, &config)
        .map_err(|e| std::io::Error::other(format!("Can't build the road network. {e}")))?;
    println!("{}", model.cyan());
    writeln!(out, "* Network\n- {model}")?;

    plan(&mut out, &mut model, &args)?;
    if let Some(path) = model.path() {
        writeln!(out, "* Stored route\n- {path}")?;
    }

    out.flush()
}
