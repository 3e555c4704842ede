use std::path::PathBuf;

use clap::Args;

use super::{load_config, load_graph, lower_or_exit};

#[derive(Args)]
pub struct CheckArgs {
    /// Input graph description (.json)
    pub input: PathBuf,
    /// Lowering configuration (.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn cmd_check(args: CheckArgs) {
    let config = load_config(args.config.as_ref(), false);
    let program = lower_or_exit(load_graph(&args.input), &config);
    print!("{}", program.summary());
    let unresolved = program.unresolved_count();
    if unresolved > 0 {
        eprintln!("note: {} value(s) left for the loader to patch", unresolved);
    }
    eprintln!("OK: {}", args.input.display());
}
