use anyhow::Result;

use streamhunt::config::Config;
use streamhunt::{MediaTarget, ResolveOptions};

use super::output::{cli_options, print_failure, print_resolved};
use super::OutputFormat;

pub async fn cmd_resolve(config: &Config, target: &MediaTarget, format: OutputFormat) -> Result<()> {
    let engine = config.engine()?;
    let options = cli_options(ResolveOptions::for_environment(config.environment), format);

    if format == OutputFormat::Text {
        eprintln!("🎬 Resolving {target} ({:?} environment)", config.environment);
    }

    match engine.resolve(target, &options).await {
        Ok(resolved) => print_resolved(&resolved, format),
        Err(err) => {
            print_failure(&err, format)?;
            Err(err.into())
        }
    }
}
