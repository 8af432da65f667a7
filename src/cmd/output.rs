use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use streamhunt::media::StreamKind;
use streamhunt::{Attempt, ResolveError, ResolveEvent, ResolveOptions, ResolvedMedia, Stream};

use super::OutputFormat;

/// Resolve options for the CLI: progress on stderr, Ctrl-C cancels.
pub fn cli_options(base: ResolveOptions, format: OutputFormat) -> ResolveOptions {
    let cancel = CancellationToken::new();
    let mut options = base
        .cancel_token(cancel.clone())
        .on_event(|event| match event {
            ResolveEvent::SourceStarted { id } => tracing::debug!("source {id} started"),
            ResolveEvent::EmbedStarted { id, url } => tracing::debug!("embed {id} started: {url}"),
            ResolveEvent::AdapterFailed {
                id,
                reason,
                unexpected: true,
            } => tracing::warn!("{id} failed: {reason}"),
            _ => {}
        });

    // Only draw a progress line for a human watching the terminal.
    if format == OutputFormat::Text && std::io::stderr().is_terminal() {
        options.on_progress = Some(Arc::new(|percent| {
            eprint!("\r⏳ {percent:>3}%");
            if percent == 100 {
                eprintln!();
            }
        }));
    }

    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Cancelling...");
            watcher.cancel();
        }
    });

    options
}

pub fn print_resolved(resolved: &ResolvedMedia, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(resolved),
        OutputFormat::Text => {
            for entry in &resolved.streams {
                let via = match (&entry.source_id, &entry.embed_id) {
                    (Some(source), Some(embed)) => format!("{source} → {embed}"),
                    (Some(source), None) => source.clone(),
                    (None, Some(embed)) => embed.clone(),
                    (None, None) => "-".to_string(),
                };
                println!("✅ {} via {via}", entry.stream.id);
                print_stream(&entry.stream);
            }
            Ok(())
        }
    }
}

fn print_stream(stream: &Stream) {
    println!("   type:  {}", stream.type_name());
    println!("   flags: {}", stream.flags);
    match &stream.kind {
        StreamKind::Hls { playlist } => println!("   playlist: {playlist}"),
        StreamKind::File { qualities } => {
            for (quality, file) in qualities {
                println!("   {quality:>7}: {}", file.url);
            }
        }
    }
    for (name, value) in &stream.headers {
        println!("   header {name}: {value}");
    }
    for caption in &stream.captions {
        println!(
            "   caption {} ({:?}): {}",
            caption.language, caption.caption_type, caption.url
        );
    }
    if let Some(track) = &stream.thumbnail_track {
        println!("   thumbnails: {}", track.url);
    }
}

/// Print the per-provider trail to stderr, or everything as JSON to stdout.
/// The error itself is reported by the caller.
pub fn print_failure(err: &ResolveError, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        #[derive(Serialize)]
        struct Failure<'a> {
            error: String,
            attempts: &'a [Attempt],
        }
        return print_json(&Failure {
            error: err.to_string(),
            attempts: err.attempts(),
        });
    }

    if !err.attempts().is_empty() {
        eprintln!("❌ Attempts:");
    }
    for attempt in err.attempts() {
        eprintln!("   {attempt}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
