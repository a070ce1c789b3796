mod args;

use args::RootArgs;
use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{Level, debug, error, info};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use yt_playlist_import::sync::import_folder;
use yt_playlist_import::video_api::DynVideoApi;
use yt_playlist_import::youtube::YoutubeApi;

async fn build_api(args: &RootArgs) -> Result<DynVideoApi> {
    let api = YoutubeApi::new_oauth(
        &args.client_secret,
        &args.token,
        args.clear_cache,
        args.proxy.as_deref(),
    )
    .await?;
    Ok(Box::new(api))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = RootArgs::parse();

    // Only show logs of this crate
    let level: Level = args.logging.clone().into();
    let filter = Targets::new().with_target("yt_playlist_import", Level::TRACE);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .finish()
        .with(filter)
        .init();
    debug!("CMD arguments: {:?}", args);

    let api = match build_api(&args).await {
        Ok(api) => api,
        Err(e) => {
            error!("authentication failed: {:#}", e);
            error!("troubleshooting:");
            error!("1. make sure {:?} exists", args.client_secret);
            error!("2. ensure the YouTube Data API v3 is enabled in the Google Cloud Console");
            error!("3. check that your OAuth consent screen is configured");
            return Err(e);
        }
    };
    info!("OAuth authentication successful");

    import_folder(&api, &args.config).await?;

    Ok(())
}
