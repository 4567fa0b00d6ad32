//! End-to-end run: read the two input files, solve every circuit, verify the
//! result, write the mapping file and report per-circuit quality of results.

use crate::{
    logical_circuit::read_logical_circuits,
    qor::{calculate_fpga_qor_for_circuit, geomean_fpga_area, CircuitQor},
    solve::{solve_all_circuits, SolverOptions},
    RamArchs,
};
use anyhow::{ensure, Context};
use std::{path::PathBuf, time::Instant};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub logic_block_file: PathBuf,
    pub logical_ram_file: PathBuf,
    pub output_file: PathBuf,
    /// Architecture descriptor; `None` uses
    /// [`DEFAULT_ARCH_DESCRIPTOR`](crate::DEFAULT_ARCH_DESCRIPTOR).
    pub arch_descriptor: Option<String>,
    pub solver: SolverOptions,
    /// Emit the per-circuit QoR table.
    pub area_report: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub num_circuits: usize,
    pub geomean_fpga_area: f64,
    pub elapsed_seconds: f64,
}

pub fn run(options: &RunOptions) -> anyhow::Result<RunSummary> {
    let started = Instant::now();

    let archs = match &options.arch_descriptor {
        Some(descriptor) => RamArchs::from_descriptor(descriptor)
            .context("Invalid architecture descriptor")?,
        None => RamArchs::default_archs(),
    };
    for arch in archs.iter() {
        tracing::info!("RAM arch: {arch}");
    }
    tracing::info!("Logic block: {}", archs.lb_arch());

    let circuits = read_logical_circuits(&options.logic_block_file, &options.logical_ram_file)?;
    let acc = solve_all_circuits(&archs, &circuits, &options.solver)?;
    ensure!(
        acc.circuits().len() == circuits.len(),
        "Final mapping must contain the same number of circuits as the input"
    );
    acc.verify()
        .context("Solved mapping violates a structural invariant")?;
    acc.write_to_file(&options.output_file)?;

    if options.area_report {
        tracing::info!("{}", CircuitQor::banner(archs.len()));
    }
    let mut areas = Vec::with_capacity(acc.circuits().len());
    for (circuit_id, cc) in acc.circuits() {
        let lc = circuits
            .get(circuit_id)
            .expect("mapping keys mirror the input circuits");
        let qor = calculate_fpga_qor_for_circuit(&archs, lc, cc, true, false);
        if options.area_report {
            tracing::info!("{qor}");
        }
        areas.push(qor.fpga_area);
    }

    let geomean = geomean_fpga_area(&areas).unwrap_or(0.0);
    let elapsed_seconds = started.elapsed().as_secs_f64();
    tracing::info!(
        "Geometric average area for {} circuits: {geomean:.6E}",
        areas.len()
    );
    tracing::info!("Total elapsed {elapsed_seconds:.3} seconds");

    Ok(RunSummary {
        num_circuits: areas.len(),
        geomean_fpga_area: geomean,
        elapsed_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LB_FILE: &str = "Circuit\t#Logic_blocks\n0\t100\n1\t80\n";
    const LR_FILE: &str = "\
Num_Circuits 2
Circuit\tRamID\tMode\t\tDepth\tWidth
0\t0\tSimpleDualPort\t45\t12
1\t0\tSinglePort\t1025\t30
1\t1\tROM\t\t1024\t8
";

    fn write_inputs(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let lb = dir.join("logic_block_count.txt");
        let lr = dir.join("logical_rams.txt");
        fs::write(&lb, LB_FILE).unwrap();
        fs::write(&lr, LR_FILE).unwrap();
        (lb, lr)
    }

    #[test]
    fn run_end_to_end_and_reproduce() {
        let dir = tempfile::tempdir().unwrap();
        let (lb, lr) = write_inputs(dir.path());
        let options = RunOptions {
            logic_block_file: lb,
            logical_ram_file: lr,
            output_file: dir.path().join("mapping.txt"),
            arch_descriptor: None,
            solver: SolverOptions::default(),
            area_report: false,
        };
        let summary = run(&options).unwrap();
        assert_eq!(summary.num_circuits, 2);
        assert!(summary.geomean_fpga_area > 0.0);

        let first = fs::read_to_string(&options.output_file).unwrap();
        assert!(first.starts_with("// Num_Circuits 2\n"));
        crate::AllCircuitConfig::parse(&first).unwrap();

        // A second run over the same inputs is byte-identical.
        run(&options).unwrap();
        let second = fs::read_to_string(&options.output_file).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            logic_block_file: dir.path().join("nope.txt"),
            logical_ram_file: dir.path().join("nope2.txt"),
            output_file: dir.path().join("mapping.txt"),
            arch_descriptor: None,
            solver: SolverOptions::default(),
            area_report: false,
        };
        assert!(run(&options).is_err());
    }

    #[test]
    fn custom_architecture_without_lutram() {
        let dir = tempfile::tempdir().unwrap();
        let (lb, lr) = write_inputs(dir.path());
        let options = RunOptions {
            logic_block_file: lb,
            logical_ram_file: lr,
            output_file: dir.path().join("mapping.txt"),
            arch_descriptor: Some("-b 8192 32 10 1 -b 131072 128 300 1".to_string()),
            solver: SolverOptions::default(),
            area_report: true,
        };
        let summary = run(&options).unwrap();
        assert_eq!(summary.num_circuits, 2);
        let text = fs::read_to_string(&options.output_file).unwrap();
        // Only the two block RAM types can appear.
        assert!(!text.contains("Type 3"));
        crate::AllCircuitConfig::parse(&text).unwrap();
    }
}
