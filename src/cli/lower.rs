use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{load_config, load_graph, lower_or_exit};

#[derive(Args)]
pub struct LowerArgs {
    /// Input graph description (.json)
    pub input: PathBuf,
    /// Output program descriptor (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Lowering configuration (.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Lower operators in parallel
    #[arg(long)]
    pub parallel: bool,
}

pub fn cmd_lower(args: LowerArgs) {
    let config = load_config(args.config.as_ref(), args.parallel);
    let program = lower_or_exit(load_graph(&args.input), &config);

    let json = match program.to_json() {
        Ok(j) => j,
        Err(e) => {
            eprintln!("error: cannot serialize program: {}", e);
            process::exit(1);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            eprintln!(
                "Lowered {} kernel(s) -> {}",
                program.kernels().len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
}
