//! `streamhunt` CLI - Resolve playable streams for movies and episodes

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use streamhunt::config;
use streamhunt::{Environment, MediaTarget};

#[derive(Parser)]
#[command(name = "streamhunt")]
#[command(about = "Resolve playable video streams through ranked scraping providers")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/streamhunt/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Proxy URL for providers that need proxied requests
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Playback environment: native or browser
    #[arg(long = "env", global = true)]
    environment: Option<Environment>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a movie
    Movie {
        /// Movie title
        title: String,

        /// Release year
        #[arg(short, long)]
        year: u32,

        /// TMDB id
        #[arg(long)]
        tmdb_id: String,

        /// IMDb id (some providers need it)
        #[arg(long)]
        imdb_id: Option<String>,
    },

    /// Resolve a show episode
    Show {
        /// Show title
        title: String,

        /// Season number
        #[arg(short, long)]
        season: u32,

        /// Episode number
        #[arg(short, long)]
        episode: u32,

        /// First-air year
        #[arg(short, long)]
        year: u32,

        /// TMDB id
        #[arg(long)]
        tmdb_id: String,

        /// IMDb id (some providers need it)
        #[arg(long)]
        imdb_id: Option<String>,
    },

    /// Run a single embed provider against an embed URL
    Embed {
        /// Embed provider id (e.g. filemoon, vidplay)
        embed_id: String,

        /// Embed URL
        url: String,
    },

    /// List registered providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load_config()?,
    };
    if let Some(proxy) = cli.proxy {
        config.proxy_url = Some(proxy);
    }
    if let Some(environment) = cli.environment {
        config.environment = environment;
    }
    let output = cmd::OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Movie {
            title,
            year,
            tmdb_id,
            imdb_id,
        } => {
            let target = with_imdb(MediaTarget::movie(title, year, tmdb_id), imdb_id);
            cmd::cmd_resolve(&config, &target, output).await?;
        }
        Commands::Show {
            title,
            season,
            episode,
            year,
            tmdb_id,
            imdb_id,
        } => {
            let target = with_imdb(
                MediaTarget::episode(title, year, tmdb_id, season, episode),
                imdb_id,
            );
            cmd::cmd_resolve(&config, &target, output).await?;
        }
        Commands::Embed { embed_id, url } => {
            cmd::cmd_embed(&config, &embed_id, &url, output).await?;
        }
        Commands::Providers => {
            cmd::cmd_providers(&config, output)?;
        }
    }

    Ok(())
}

fn with_imdb(target: MediaTarget, imdb_id: Option<String>) -> MediaTarget {
    match imdb_id {
        Some(id) => target.with_imdb_id(id),
        None => target,
    }
}
