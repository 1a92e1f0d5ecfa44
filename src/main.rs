mod cli;

use instadl::{
    config::AppConfig,
    downloader::{extractors::ExtractorConfig, is_acceptable, FormatSelector, YtDlpExtractor},
    server::{self, AppContext},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

/// Resolve the extractor off the async workers; warns if yt-dlp can't run
async fn detect_extractor(config: ExtractorConfig) -> Result<YtDlpExtractor> {
    let (extractor, available) = YtDlpExtractor::detect(config).await?;
    if !available {
        tracing::warn!(
            "{} is not runnable; requests will fail until yt-dlp is installed",
            extractor.program()
        );
    }
    Ok(extractor)
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting instadl");
    tracing::info!("Media root {:?} served at {}", config.media.root, config.media.url_prefix);

    let extractor = detect_extractor(config.extractor.clone()).await?;
    let ctx = AppContext::new(config, Arc::new(extractor));
    server::start_server(ctx).await
}

async fn resolve_once(config: AppConfig, url: &str) -> Result<()> {
    let url = url.trim();
    if !is_acceptable(url) {
        anyhow::bail!("Not an Instagram URL: {}", url);
    }

    let extractor = detect_extractor(config.extractor.clone()).await?;
    let ctx = AppContext::new(config, Arc::new(extractor));
    let options = ctx.options.build();
    let info = ctx.extractor.extract(url, &options).await?;

    match FormatSelector::select_from(&info) {
        Some(selection) => {
            println!("{}", selection.url);
            tracing::info!(
                "{:?} rendition {} ({})",
                selection.tier,
                selection.format_id.as_deref().unwrap_or("-"),
                info.title.as_deref().unwrap_or("untitled")
            );
            Ok(())
        }
        None => anyhow::bail!("Could not resolve a direct media URL"),
    }
}

async fn check_tools(config: AppConfig) -> Result<()> {
    let extractor = detect_extractor(config.extractor).await?;
    match extractor.version().await {
        Some(version) => {
            println!("✓ yt-dlp {} ({} mode, {})", version, extractor.mode(), extractor.program());
            Ok(())
        }
        None => {
            println!("✗ yt-dlp not found ({} mode, tried {})", extractor.mode(), extractor.program());
            anyhow::bail!("yt-dlp is not available")
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env first so RUST_LOG in it takes effect
    let _ = dotenvy::dotenv();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "instadl=trace,tower_http=debug".to_string()
        } else {
            "instadl=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    let config = AppConfig::from_env()?;
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => rt.block_on(serve(config, host, port)),
        Commands::Resolve { url } => rt.block_on(resolve_once(config, &url)),
        Commands::CheckTools => rt.block_on(check_tools(config)),
    }
}
