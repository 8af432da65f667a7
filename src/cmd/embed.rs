use anyhow::Result;

use streamhunt::config::Config;
use streamhunt::provider::Provider;
use streamhunt::ResolveOptions;

use super::output::{cli_options, print_failure, print_resolved};
use super::OutputFormat;

pub async fn cmd_embed(
    config: &Config,
    embed_id: &str,
    url: &str,
    format: OutputFormat,
) -> Result<()> {
    let engine = config.engine()?;
    if engine.registry().get_embed(embed_id).is_none() {
        let known: Vec<String> = engine
            .registry()
            .embeds()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        anyhow::bail!("Unknown embed: {embed_id}. Known embeds: {}", known.join(", "));
    }

    let options = cli_options(ResolveOptions::for_environment(config.environment), format);
    if format == OutputFormat::Text {
        eprintln!("🔗 Embed {embed_id}: {url}");
    }

    match engine.resolve_embed(embed_id, url, &options).await {
        Ok(resolved) => print_resolved(&resolved, format),
        Err(err) => {
            print_failure(&err, format)?;
            Err(err.into())
        }
    }
}
