mod api;
mod args;
mod change;
mod cycle;
mod live;
mod resolver;

use std::time::Duration;

use clap::Parser;

use meridian_store::PgTrackerStore;

use crate::api::TrackerApi;
use crate::args::Args;
use crate::cycle::poll_loop;
use crate::resolver::DeviceResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meridian_common::logging::init();

    let args = Args::parse();
    tracing::info!(api_url=%args.api_url, "meridian-ingest starting...");

    let store = PgTrackerStore::connect(&args.database_url).await?;
    store.ensure_schema().await?;

    let api = TrackerApi::login(
        &args.api_url,
        &args.api_email,
        &args.api_password,
        Duration::from_secs(args.http_timeout_secs),
    )
    .await?;
    tracing::info!("authenticated against upstream API");

    let resolver = DeviceResolver::new();
    poll_loop(
        &api,
        &resolver,
        &store,
        Duration::from_secs(args.poll_interval_secs),
    )
    .await;

    Ok(())
}
