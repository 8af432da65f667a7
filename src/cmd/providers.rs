use anyhow::Result;
use serde::Serialize;

use streamhunt::config::Config;
use streamhunt::provider::Provider;
use streamhunt::{FlagSet, ProviderRegistry};

use super::OutputFormat;

#[derive(Serialize)]
struct ProviderRow {
    id: String,
    name: String,
    kind: &'static str,
    rank: i32,
    flags: String,
    media: String,
    enabled: bool,
    eligible: bool,
}

fn row<P: Provider + ?Sized>(
    registry: &ProviderRegistry,
    required: &FlagSet,
    provider: &P,
    kind: &'static str,
    media: String,
) -> ProviderRow {
    ProviderRow {
        id: provider.id().to_string(),
        name: provider.name().to_string(),
        kind,
        rank: provider.rank(),
        flags: provider.flags().to_string(),
        media,
        enabled: !provider.disabled() && !registry.is_disabled_by_config(provider.id()),
        eligible: registry.is_eligible(provider, required),
    }
}

pub fn cmd_providers(config: &Config, format: OutputFormat) -> Result<()> {
    let engine = config.engine()?;
    let registry = engine.registry();
    let required = config.environment.required_flags();

    let mut rows: Vec<ProviderRow> = registry
        .sources()
        .iter()
        .map(|s| row(registry, &required, s.as_ref(), "source", s.supports().to_string()))
        .chain(
            registry
                .embeds()
                .iter()
                .map(|e| row(registry, &required, e.as_ref(), "embed", "-".to_string())),
        )
        .collect();
    rows.sort_by(|a, b| a.kind.cmp(b.kind).reverse().then(b.rank.cmp(&a.rank)));

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<7} {:>5}  {:<13} {:<11} STATUS",
        "ID", "KIND", "RANK", "FLAGS", "MEDIA"
    );
    for r in &rows {
        let status = match (r.enabled, r.eligible) {
            (false, _) => "disabled",
            (true, false) => "ineligible",
            (true, true) => "ok",
        };
        println!(
            "{:<12} {:<7} {:>5}  {:<13} {:<11} {status}",
            r.id, r.kind, r.rank, r.flags, r.media
        );
    }
    let environment = format!("{:?}", config.environment).to_lowercase();
    println!("\n({environment} environment)");
    Ok(())
}
