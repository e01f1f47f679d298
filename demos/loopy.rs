//! Sum-product on a periodic Ising lattice
//!
//! Usage:
//!   cargo run --example loopy -- --side 6 --damping 0.3
//!   cargo run --example loopy -- --config bp.yaml

use std::path::PathBuf;

use clap::Parser;
use log::info;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};
use sumprod::core::{Assignment, BPConfig, FactorGraphBuilder, FactorResult, VariableId};
use sumprod::factors::FnFactor;

#[derive(Parser)]
#[command(name = "loopy")]
#[command(about = "Loopy belief propagation on a random Ising model on a torus")]
struct Cli {
    /// YAML file with belief propagation hyper-parameters
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Side of the square lattice
    #[arg(long, default_value_t = 5)]
    side: usize,

    /// Magnetic field per spin
    #[arg(long, default_value_t = 0.2)]
    field: f64,

    /// Std of coupling constants
    #[arg(long, default_value_t = 0.3)]
    coupling_std: f64,

    /// Overrides the maximal number of sweeps
    #[arg(long)]
    max_iter: Option<usize>,

    /// Overrides the convergence threshold
    #[arg(long)]
    max_error: Option<f64>,

    /// Overrides the damping coefficient
    #[arg(long)]
    damping: Option<f64>,

    /// Keeps variable to factor messages unnormalized
    #[arg(long)]
    literal: bool,
}

fn load_config(cli: &Cli) -> BPConfig {
    let mut config = match &cli.config {
        Some(path) => {
            let source = std::fs::read_to_string(path).unwrap();
            serde_yaml::from_str(&source).unwrap()
        }
        None => BPConfig {
            normalize_outgoing: true,
            ..Default::default()
        },
    };
    if let Some(max_iter) = cli.max_iter {
        config.max_iter = max_iter;
    }
    if let Some(max_error) = cli.max_error {
        config.max_error = max_error;
    }
    if let Some(damping) = cli.damping {
        config.damping = damping;
    }
    if cli.literal {
        config.normalize_outgoing = false;
    }
    config
}

fn spin(assignment: &Assignment<'_, i8>, variable: VariableId) -> FactorResult<f64> {
    Ok(*assignment.value(variable)? as f64)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli);
    info!("{:?}", config);
    let side = cli.side;
    let field = cli.field;
    let distr = Normal::new(0f64, cli.coupling_std).unwrap();
    let mut rng = thread_rng();
    // -------------------------------------------------------------------------------------
    let mut fgb = FactorGraphBuilder::new();
    let spins: Vec<VariableId> = (0..side * side)
        .map(|i| fgb.add_variable(format!("s{i}"), [-1i8, 1]).unwrap())
        .collect();
    for (i, s) in spins.iter().copied().enumerate() {
        let h = FnFactor::new(move |a: &Assignment<'_, i8>| -> FactorResult<f64> {
            Ok((field * spin(a, s)?).exp())
        });
        fgb.add_factor(format!("h{i}"), h, &[s]).unwrap();
        let (row, col) = (i / side, i % side);
        let right = spins[row * side + (col + 1) % side];
        let down = spins[((row + 1) % side) * side + col];
        for (dir, t) in [("r", right), ("d", down)] {
            let j = distr.sample(&mut rng);
            let coupling = FnFactor::new(move |a: &Assignment<'_, i8>| -> FactorResult<f64> {
                Ok((j * spin(a, s)? * spin(a, t)?).exp())
            });
            fgb.add_factor(format!("J{dir}{i}"), coupling, &[s, t])
                .unwrap();
        }
    }
    let mut fg = fgb.build();
    fg.initialize_messages();
    let info = fg.run(&config).unwrap();
    println!("{}", info);
    // -------------------------------------------------------------------------------------
    let marginals = fg.marginals().unwrap();
    let magnetization: f64 =
        marginals.iter().map(|m| m[1] - m[0]).sum::<f64>() / marginals.len() as f64;
    println!("Mean magnetization: {}", magnetization);
    for (i, m) in marginals.iter().enumerate().take(side) {
        println!("p(s{} = +1) = {:.6}", i, m[1]);
    }
}
