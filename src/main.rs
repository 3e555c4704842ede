use clap::{Parser, Subcommand};

mod cli;

use cli::check::CheckArgs;
use cli::lower::LowerArgs;
use cli::show::ShowArgs;

#[derive(Parser)]
#[command(
    name = "kernelsmith",
    version,
    about = "Lower operator graphs to Metal compute kernels"
)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lower a graph description to a program descriptor (JSON)
    Lower(LowerArgs),
    /// Lower a graph description and print a kernel summary
    Check(CheckArgs),
    /// Print the generated source of one operator's kernel
    Show(ShowArgs),
}

fn main() {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);

    match cli.command {
        Command::Lower(args) => cli::lower::cmd_lower(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Show(args) => cli::show::cmd_show(args),
    }
}
