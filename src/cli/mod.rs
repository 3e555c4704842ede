pub mod check;
pub mod lower;
pub mod show;

use std::path::{Path, PathBuf};
use std::process;

use kernelsmith::diagnostic::Diagnostic;
use kernelsmith::span::Span;
use kernelsmith::{GraphDescription, LoweringConfig, ProgramDescriptor};

/// Install the stderr log subscriber. Warnings are always shown.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// A graph description read from disk, with its text for diagnostics.
pub struct LoadedGraph {
    pub description: GraphDescription,
    pub filename: String,
    pub source: String,
}

pub fn load_graph(input: &Path) -> LoadedGraph {
    let filename = input.display().to_string();
    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", filename, e);
            process::exit(1);
        }
    };
    match GraphDescription::from_json(&source) {
        Ok(description) => LoadedGraph {
            description,
            filename,
            source,
        },
        Err(e) => {
            let span = Span::at_line_col(&source, e.line(), e.column());
            Diagnostic::error(format!("invalid graph description: {}", e), span)
                .render(&filename, &source);
            process::exit(1);
        }
    }
}

/// Built-in Metal configuration, or the file given with `--config`.
pub fn load_config(config: Option<&PathBuf>, parallel: bool) -> LoweringConfig {
    let mut loaded = match config {
        Some(path) => match LoweringConfig::load(path) {
            Ok(c) => c,
            Err(diag) => {
                diag.render(&path.display().to_string(), "");
                process::exit(1);
            }
        },
        None => LoweringConfig::metal(),
    };
    loaded.parallel |= parallel;
    loaded
}

/// Lower `graph`, or render the violation and exit.
pub fn lower_or_exit(graph: LoadedGraph, config: &LoweringConfig) -> ProgramDescriptor {
    let LoadedGraph {
        description,
        filename,
        source,
    } = graph;
    match kernelsmith::lower_description(description, config) {
        Ok(program) => program,
        Err(e) => {
            e.to_diagnostic().render(&filename, &source);
            process::exit(1);
        }
    }
}
