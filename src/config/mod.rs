use std::path::Path;

use crate::diagnostic::Diagnostic;
use crate::kir::kernel::GpuSize;
use crate::span::Span;

/// Launch sizes applied to every generated kernel.
///
/// There is no tuning: the grid is a fixed preset and the threadgroup
/// size defaults to the device maximum, resolved by the loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    pub grid: GpuSize,
    pub threadgroup: GpuSize,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            grid: GpuSize::fixed(8, 1, 1),
            threadgroup: GpuSize::max_threads(),
        }
    }
}

/// Lowering configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweringConfig {
    /// Backend name (only "metal" is built in).
    pub target: String,
    pub launch: LaunchConfig,
    /// Lower operators on the rayon thread pool.
    pub parallel: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self::metal()
    }
}

impl LoweringConfig {
    /// Built-in Metal configuration.
    pub fn metal() -> Self {
        Self {
            target: "metal".to_string(),
            launch: LaunchConfig::default(),
            parallel: false,
        }
    }

    /// Load a configuration from a TOML file. Keys not present keep their
    /// built-in defaults.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read lowering config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self, Diagnostic> {
        let err =
            |msg: String| Diagnostic::error(format!("{}: {}", path.display(), msg), Span::dummy());

        let mut config = Self::metal();
        let mut section = String::new();

        for line in content.lines() {
            let trimmed = strip_comment(line).trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=') {
                let key = key.trim();
                let value = value.trim();
                let unquoted = value.trim_matches('"');

                match (section.as_str(), key) {
                    ("target", "name") => config.target = unquoted.to_string(),
                    ("launch", "grid") => {
                        let [x, y, z] = parse_size(value)
                            .ok_or_else(|| err(format!("invalid launch.grid: {}", value)))?;
                        config.launch.grid = GpuSize::fixed(x, y, z);
                    }
                    ("launch", "threadgroup") => {
                        config.launch.threadgroup = if unquoted == "max" {
                            GpuSize::max_threads()
                        } else {
                            let [x, y, z] = parse_size(value).ok_or_else(|| {
                                err(format!(
                                    "invalid launch.threadgroup: {} (expected \"max\" or [x, y, z])",
                                    value
                                ))
                            })?;
                            GpuSize::fixed(x, y, z)
                        };
                    }
                    ("lowering", "parallel") => {
                        config.parallel = match value {
                            "true" => true,
                            "false" => false,
                            other => {
                                return Err(err(format!("invalid lowering.parallel: {}", other)))
                            }
                        };
                    }
                    _ => {
                        tracing::debug!(section = %section, key, "ignoring unknown config key");
                    }
                }
            } else {
                return Err(err(format!("expected 'key = value', found '{}'", trimmed)));
            }
        }

        match config.target.as_str() {
            "metal" | "msl" | "webgpu" => {}
            other => {
                return Err(err(format!("unknown target '{}'", other))
                    .with_help("available targets: metal".to_string()))
            }
        }

        Ok(config)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Parse `[x, y, z]` with every dimension positive.
fn parse_size(value: &str) -> Option<[u32; 3]> {
    let inner = value.trim().strip_prefix('[')?.strip_suffix(']')?;
    let dims: Vec<u32> = inner
        .split(',')
        .map(|s| s.trim().parse::<u32>().ok().filter(|v| *v > 0))
        .collect::<Option<_>>()?;
    dims.try_into().ok()
}
