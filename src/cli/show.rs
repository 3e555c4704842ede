use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{load_config, load_graph, lower_or_exit};

#[derive(Args)]
pub struct ShowArgs {
    /// Input graph description (.json)
    pub input: PathBuf,
    /// Operator id whose kernel to print
    #[arg(long)]
    pub op: u32,
    /// Also print the metadata buffer and deferred values
    #[arg(long)]
    pub meta: bool,
    /// Lowering configuration (.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn cmd_show(args: ShowArgs) {
    let config = load_config(args.config.as_ref(), false);
    let program = lower_or_exit(load_graph(&args.input), &config);

    let suffix = format!("_{}", args.op);
    let Some(kernel) = program.kernels().iter().find(|k| k.name().ends_with(&suffix)) else {
        eprintln!("error: no kernel for operator {}", args.op);
        process::exit(1);
    };

    print!("{}", kernel.source());
    if args.meta {
        let cells: Vec<String> = kernel
            .meta_buffer()
            .map(|m| m.cells().iter().map(|c| c.as_int().to_string()).collect())
            .unwrap_or_default();
        println!("// meta_buffer = [{}]", cells.join(", "));
        for value in kernel.unresolved_values() {
            println!(
                "// meta_buffer[{}] ({}) <- {}",
                value.cell, value.key, value.placeholder
            );
        }
    }
}
