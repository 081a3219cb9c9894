#![warn(unused_extern_crates)]
use anyhow::Result;
use clap::Parser;
use eymo_nose::client::NoseClient;
use eymo_nose::config::{CmdArgs, Command, OverlayArgs, ServeArgs};
use eymo_nose::nose::estimate_noses;
use eymo_nose::overlay::overlay_noses;
use eymo_nose::pipeline::Pipeline;
use eymo_nose::server::{self, AppState};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = CmdArgs::parse();

    match args.command {
        Some(Command::Serve(serve)) => run_server(serve).await,
        Some(Command::Overlay(overlay)) => run_overlay(overlay).await,
        None => run_server(args.serve).await,
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let pipeline = Pipeline::new(&args.model.pipeline_config())?;
    server::serve(args.server_config(), AppState::new(pipeline)).await
}

async fn run_overlay(args: OverlayArgs) -> Result<()> {
    let mut img = image::open(&args.input)?.into_rgb8();
    let sprite = image::open(&args.overlay)?.into_rgba8();

    let start = Instant::now();
    let noses = match args.server {
        Some(url) => NoseClient::new(&url).detect(&img).await?,
        None => {
            let mut pipeline = Pipeline::new(&args.model.pipeline_config())?;
            estimate_noses(&mut pipeline, &img)?
        }
    };
    debug!("{noses:?}");
    debug!("Took {:?}", start.elapsed());

    overlay_noses(&mut img, &sprite, &noses);
    img.save(&args.output)?;
    info!("{} noses, result at {:?}", noses.len(), args.output);

    Ok(())
}
