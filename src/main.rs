//! Media Cache CLI application
//!
//! Command-line front end for the read-through media cache: fetch files and
//! thumbnails through the cache, and inspect or tidy the cache directories.

use std::process;

use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use media_cache::cli::{
    handle_cache, handle_get, handle_init, handle_parse, handle_thumb, Cli, CommandContext,
    Commands,
};
use media_cache::config::AppConfig;
use media_cache::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error ({}): {}", e.category(), e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    let level = match cli.log_level() {
        Some(level) => level,
        None => config.logging.level()?,
    };
    init_logging(level, cli.global.very_verbose);

    info!("Media Cache v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::new(config, cli.global.cache_dir.as_deref(), cli.global.quiet)?;
    info!("Using cache root {}", ctx.cache_root.display());

    match cli.command {
        Commands::Init(args) => {
            info!("Executing init command");
            handle_init(args, &ctx).await
        }
        Commands::Get(args) => {
            info!("Executing get command");
            handle_get(args, &ctx).await
        }
        Commands::Thumb(args) => {
            info!("Executing thumb command");
            handle_thumb(args, &ctx).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &ctx).await
        }
        Commands::Parse(args) => handle_parse(args, &ctx),
    }
}

/// Initialize logging at `level` for this crate; RUST_LOG adds further directives
fn init_logging(level: Level, show_levels: bool) {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("media_cache={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(show_levels)
        .init();
}
