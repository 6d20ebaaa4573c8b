// captionmaption - photo analysis and creative caption generation over OpenAI vision
// Author: kelexine (https://github.com/kelexine)

use anyhow::{Context, Result};
use captionmaption::cache::{FileStore, KeyValueStore, MemoryStore};
use captionmaption::caption::CaptionOrchestrator;
use captionmaption::cli::{Args, CaptionArgs, Command, DescribeArgs};
use captionmaption::config::AppConfig;
use captionmaption::error::CaptionError;
use captionmaption::models::{CaptionResult, GenerationOptions, Tag};
use captionmaption::openai::OpenAiClient;
use captionmaption::server::create_router;
use captionmaption::utils::logging;
use captionmaption::vision::ImagePayload;
use clap::Parser;
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load()?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting captionmaption v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the session orchestrator
    config.require_api_key()?;
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    // Phase 4: Dispatch
    match args.command {
        Command::Serve => serve(config, orchestrator).await,
        Command::Caption(caption_args) => caption_files(&orchestrator, &caption_args).await,
        Command::Describe(describe_args) => describe_file(&orchestrator, &describe_args).await,
    }
}

fn build_orchestrator(config: &AppConfig) -> Result<CaptionOrchestrator> {
    let durable: Arc<dyn KeyValueStore> = if config.cache.persist {
        info!("Durable cache directory: {}", config.cache.directory);
        Arc::new(FileStore::new(&config.cache.directory))
    } else {
        info!("Durable cache kept in memory");
        Arc::new(MemoryStore::new())
    };

    let client = OpenAiClient::new(&config.openai)?;
    Ok(CaptionOrchestrator::from_config(config, Arc::new(client), durable))
}

async fn serve(config: AppConfig, orchestrator: Arc<CaptionOrchestrator>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, orchestrator)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Caption files in order. A stored analysis is reused unless `--refresh`;
/// local throttling waits out the reported delay and tries the file again.
async fn caption_files(orchestrator: &CaptionOrchestrator, args: &CaptionArgs) -> Result<()> {
    let options = args.options();
    let mut failures = 0usize;

    for path in &args.files {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };
        let image = ImagePayload::from_bytes(&bytes);
        let image_id = image.content_id();

        if !args.refresh {
            if let Some(entry) = orchestrator.cached_analysis(&image_id) {
                if let Some(captions) = entry.captions {
                    info!("Using stored analysis for {}", path.display());
                    print_result(path, &entry.tags, &captions, args.json)?;
                    continue;
                }
            }
        }

        match generate_with_wait(orchestrator, &image, &options, &image_id).await {
            Ok(outcome) => print_result(path, &outcome.tags, &outcome.captions, args.json)?,
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, args.files.len());
    }
    Ok(())
}

async fn describe_file(orchestrator: &CaptionOrchestrator, args: &DescribeArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let image = ImagePayload::from_bytes(&bytes);

    let description = orchestrator
        .describe(&image, args.prompt.as_deref())
        .await
        .with_context(|| format!("failed to describe {}", args.file.display()))?;
    println!("{}", description);
    Ok(())
}

async fn generate_with_wait(
    orchestrator: &CaptionOrchestrator,
    image: &ImagePayload,
    options: &GenerationOptions,
    image_id: &str,
) -> captionmaption::error::Result<captionmaption::models::CaptionOutcome> {
    loop {
        match orchestrator.generate(image, options, Some(image_id)).await {
            Err(CaptionError::RateLimitExceeded { rule, retry_after }) => {
                info!(
                    "Local {} limit hit, waiting {}ms",
                    rule.as_str(),
                    retry_after.as_millis()
                );
                tokio::time::sleep(retry_after).await;
            }
            other => return other,
        }
    }
}

fn print_result(path: &Path, tags: &[Tag], captions: &CaptionResult, as_json: bool) -> Result<()> {
    if as_json {
        let line = json!({
            "file": path.display().to_string(),
            "tags": tags,
            "captions": captions,
        });
        println!(
            "{}",
            serde_json::to_string(&line).context("failed to serialize result")?
        );
        return Ok(());
    }

    println!("{}", path.display());
    let labels: Vec<&str> = tags.iter().map(|tag| tag.label.as_str()).collect();
    println!("  Tags: {}", labels.join(", "));
    println!("  {}", captions.main_caption);
    for (i, idea) in captions.caption_ideas.iter().enumerate() {
        match &idea.hashtag {
            Some(hashtag) => println!("  {}. {} {}", i + 1, idea.caption, hashtag),
            None => println!("  {}. {}", i + 1, idea.caption),
        }
        if let Some(concept) = &idea.concept {
            println!("     ({})", concept);
        }
    }
    println!();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
