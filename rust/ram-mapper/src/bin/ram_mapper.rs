use anyhow::Result;
use clap::Parser;
use ram_mapper::{
    driver::{run, RunOptions},
    SolverOptions,
};
use std::path::PathBuf;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser)]
#[command(version, about = "Map logical RAMs onto FPGA physical RAM blocks", long_about = None)]
struct Cli {
    /// Input logic-block count file
    #[arg(long, default_value = "logic_block_count.txt")]
    lb: PathBuf,

    /// Input logical RAM file
    #[arg(long, default_value = "logical_rams.txt")]
    lr: PathBuf,

    /// Output mapping file
    #[arg(long, default_value = "mapping.txt")]
    out: PathBuf,

    /// Architecture descriptor, e.g. "-l 1 1 -b 8192 32 10 1 -b 131072 128 300 1"
    #[arg(long, allow_hyphen_values = true)]
    arch: Option<String>,

    /// Worker threads for the circuit fan-out (default: one per CPU)
    #[arg(long)]
    threads: Option<usize>,

    /// Annealing effort factor
    #[arg(long, default_value_t = 1.0)]
    effort: f64,

    /// Disable the per-circuit area report
    #[arg(long)]
    no_area_report: bool,

    /// Raise logging verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::ERROR
    } else {
        match cli.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let summary = run(&RunOptions {
        logic_block_file: cli.lb,
        logical_ram_file: cli.lr,
        output_file: cli.out,
        arch_descriptor: cli.arch,
        solver: SolverOptions {
            effort: cli.effort,
            threads: cli.threads,
        },
        area_report: !cli.no_area_report,
    })?;

    println!(
        "Geometric Average Area for {} circuits: {:.6E}",
        summary.num_circuits, summary.geomean_fpga_area
    );
    Ok(())
}
