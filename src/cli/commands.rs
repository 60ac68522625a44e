//! Command handlers for the media cache CLI
//!
//! This module implements the command handlers that connect CLI arguments to
//! the cache engine, the remote client and the configuration.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::app::cache::{format_bytes, CacheLayout, CacheManager, CacheSource};
use crate::app::client::{DropboxClient, RemoteStore};
use crate::app::models::MediaObject;
use crate::app::naming::parse_file_name;
use crate::cli::signals::shutdown_signal;
use crate::cli::{CacheAction, CacheArgs, GetArgs, InitArgs, ParseArgs, ThumbArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, CacheResult, Result};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// Resolved cache root
    pub cache_root: PathBuf,
    /// Suppress non-essential output
    pub quiet: bool,
}

impl CommandContext {
    /// Resolve the cache root from the CLI override and the configuration
    pub fn new(config: AppConfig, cache_dir: Option<&Path>, quiet: bool) -> Result<Self> {
        let cache_root = config.resolve_cache_root(cache_dir)?;
        Ok(Self {
            config,
            cache_root,
            quiet,
        })
    }

    /// Create every cache directory for the configured registry
    async fn layout(&self) -> Result<CacheLayout> {
        let layout =
            CacheLayout::initialize(&self.cache_root, self.config.registry.clone()).await?;
        Ok(layout)
    }

    /// Build the remote client and the cache manager in front of it
    async fn connect(&self) -> Result<(Arc<DropboxClient>, CacheManager)> {
        let layout = Arc::new(self.layout().await?);
        let client = Arc::new(DropboxClient::new(self.config.client.to_runtime_config())?);
        let cache = CacheManager::new(layout, client.clone());
        Ok((client, cache))
    }
}

/// Handle the init command
pub async fn handle_init(args: InitArgs, ctx: &CommandContext) -> Result<()> {
    let layout = ctx.layout().await?;

    if !ctx.quiet {
        println!("📁 Cache initialized at {}", layout.root().display());
        for dir in layout.directories() {
            println!("   {}", dir.display());
        }
    }

    if args.write_config {
        let path = AppConfig::default_config_path()?;
        let written = AppConfig::write_default_config(&path).await?;
        if !ctx.quiet {
            if written {
                println!("📝 Created default configuration file:");
            } else {
                println!("ℹ️  Configuration file already exists:");
            }
            println!("   {}", path.display());
        }
    }

    Ok(())
}

/// Handle the get command
///
/// Looks up the remote path, opens it through the cache and copies the
/// stream to the output. An interrupt drops the stream mid-transfer.
pub async fn handle_get(args: GetArgs, ctx: &CommandContext) -> Result<()> {
    let start_time = Instant::now();
    let (client, cache) = ctx.connect().await?;

    let object = resolve_object(client.as_ref(), &cache, &args.remote_path).await?;
    info!(
        "Fetching {} ({})",
        object.display_name(),
        object.identity()
    );

    let stream = cache.open(&object).await?;
    let source = stream.source();

    let progress = match (&args.output, ctx.quiet) {
        (Some(_), false) => Some(transfer_progress(stream.content_length())),
        _ => None,
    };

    let copied = save_stream(stream, args.output.as_deref(), progress.as_ref()).await;

    if let Some(progress) = &progress {
        progress.finish_and_clear();
    }

    // Let the cache write settle before the runtime shuts down
    cache.drain().await;
    debug!("Population stats: {:?}", cache.stats());

    let bytes = copied?;
    if let (Some(path), false) = (&args.output, ctx.quiet) {
        println!(
            "✅ {} {} ({}) to {} in {:.1}s",
            source_label(source),
            object.display_name(),
            format_bytes(bytes),
            path.display(),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Handle the thumb command
pub async fn handle_thumb(args: ThumbArgs, ctx: &CommandContext) -> Result<()> {
    let (client, cache) = ctx.connect().await?;

    // Reject unknown sizes before touching the network
    cache.layout().size(&args.size)?;

    let object = resolve_object(client.as_ref(), &cache, &args.remote_path).await?;
    let hits_before = cache.stats().hits;
    let content = cache.thumbnail(&object, &args.size).await?;
    let source = if cache.stats().hits > hits_before {
        CacheSource::Hit
    } else {
        CacheSource::Miss
    };

    match &args.output {
        Some(path) => tokio::fs::write(path, &content).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }
    }

    cache.drain().await;
    debug!("Population stats: {:?}", cache.stats());

    if let (Some(path), false) = (&args.output, ctx.quiet) {
        println!(
            "✅ {} {} thumbnail of {} ({}) to {}",
            source_label(source),
            args.size,
            object.display_name(),
            format_bytes(content.len() as u64),
            path.display()
        );
    }

    Ok(())
}

/// Handle cache management commands
pub async fn handle_cache(args: CacheArgs, ctx: &CommandContext) -> Result<()> {
    match args.action {
        CacheAction::Info => handle_cache_info(ctx).await,
        CacheAction::Sweep { max_age_secs } => handle_cache_sweep(ctx, max_age_secs).await,
    }
}

/// Show per-directory usage
async fn handle_cache_info(ctx: &CommandContext) -> Result<()> {
    let layout = ctx.layout().await?;
    let usage = layout.scan().await;

    println!("📊 Cache Information");
    println!("====================");
    println!("Cache root: {}", layout.root().display());
    println!();
    println!(
        "{:<16} {:>8} {:>12} {:>6} {:>12}",
        "Directory", "Entries", "Size", "Temp", "Oldest"
    );

    let mut total_entries = 0;
    let mut total_bytes = 0;
    let mut total_temp = 0;
    for dir in &usage {
        let name = dir
            .directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<16} {:>8} {:>12} {:>6} {:>12}",
            name,
            dir.entries,
            dir.format_size(),
            dir.temp_files,
            dir.oldest_entry_age
                .map(format_age)
                .unwrap_or_else(|| "-".to_string())
        );
        total_entries += dir.entries;
        total_bytes += dir.total_bytes;
        total_temp += dir.temp_files;
    }

    println!();
    println!(
        "Total: {} entries, {}, {} temp files",
        total_entries,
        format_bytes(total_bytes),
        total_temp
    );
    if total_temp > 0 {
        println!(
            "💡 Temp files older than {} can be removed with `cache sweep`.",
            format_age(ctx.config.cache.stale_temp_age())
        );
    }

    Ok(())
}

/// Remove stale temp files
async fn handle_cache_sweep(ctx: &CommandContext, max_age_secs: Option<u64>) -> Result<()> {
    let layout = ctx.layout().await?;
    let max_age = max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.cache.stale_temp_age());

    let removed = layout.sweep_stale_temp(max_age).await;
    if !ctx.quiet {
        println!(
            "🧹 Removed {} temp files older than {}",
            removed,
            format_age(max_age)
        );
    }
    Ok(())
}

/// Handle the parse command
pub fn handle_parse(args: ParseArgs, ctx: &CommandContext) -> Result<()> {
    let registry = &ctx.config.registry;

    for name in &args.names {
        match parse_file_name(name) {
            Some(parts) => {
                let format = registry
                    .format_for(&parts.type_code, &parts.extension)
                    .map(|format| format!("{} ({})", format.kind, format.mime))
                    .unwrap_or_else(|| "unsupported format".to_string());
                println!("✅ {}", name);
                println!("   id:       {}", parts.id);
                println!("   parent:   {}", parts.parent);
                if !parts.child.is_empty() {
                    println!("   child:    {}", parts.child);
                }
                println!("   number:   {}", parts.number);
                if !parts.comment.is_empty() {
                    println!("   comment:  {}", parts.comment);
                }
                println!("   format:   {}", format);
            }
            None => println!("❌ {} does not follow the naming convention", name),
        }
    }

    Ok(())
}

/// Look up a remote path and turn it into a cacheable media object
async fn resolve_object(
    client: &dyn RemoteStore,
    cache: &CacheManager,
    remote_path: &str,
) -> Result<MediaObject> {
    let meta = client.get_metadata(remote_path).await?;
    if !meta.is_file() {
        return Err(AppError::generic(format!("{} is not a file", remote_path)));
    }
    MediaObject::from_metadata(&meta, cache.layout().registry()).ok_or_else(|| {
        AppError::generic(format!(
            "{} is not a supported media file name",
            meta.name
        ))
    })
}

/// Copy `stream` to `output` or stdout until it ends or the user interrupts
///
/// A file that was not fully written is removed again.
async fn save_stream<S>(
    stream: S,
    output: Option<&Path>,
    progress: Option<&ProgressBar>,
) -> Result<u64>
where
    S: Stream<Item = CacheResult<Bytes>> + Unpin,
{
    let Some(path) = output else {
        return interruptible(copy_stream(stream, tokio::io::stdout(), progress)).await;
    };

    let file = tokio::fs::File::create(path).await?;
    let result = interruptible(copy_stream(stream, file, progress)).await;
    if result.is_err() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed partial output {}", path.display()),
            Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
        }
    }
    result
}

async fn interruptible(copy: impl Future<Output = Result<u64>>) -> Result<u64> {
    tokio::select! {
        result = copy => result,
        _ = shutdown_signal() => Err(AppError::generic("Transfer interrupted")),
    }
}

/// Copy a byte stream to `writer`, returning the number of bytes copied
async fn copy_stream<S, W>(
    mut stream: S,
    mut writer: W,
    progress: Option<&ProgressBar>,
) -> Result<u64>
where
    S: Stream<Item = CacheResult<Bytes>> + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut copied = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        copied += chunk.len() as u64;
        if let Some(progress) = progress {
            progress.set_position(copied);
        }
    }
    writer.flush().await?;
    Ok(copied)
}

fn transfer_progress(total: Option<u64>) -> ProgressBar {
    let (progress, template) = match total {
        Some(total) => (
            ProgressBar::new(total),
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA: {eta})",
        ),
        None => (
            ProgressBar::new_spinner(),
            "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})",
        ),
    };

    let style = ProgressStyle::default_bar()
        .template(template)
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

fn source_label(source: CacheSource) -> &'static str {
    match source {
        CacheSource::Hit => "Served from cache",
        CacheSource::Miss => "Downloaded and cached",
    }
}

/// Format a duration as its two most significant units
fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
