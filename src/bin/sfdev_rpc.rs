//! JSON-RPC bridge spawned by the editor plugin.
//! Reads requests from stdin and writes responses and notifications to stdout.

use sfdev_lib::{Dispatcher, SettingsSource, SfClient, logging, rpc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn");
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sfdev-rpc starting");

    let dispatcher = Dispatcher::new(SfClient::system(), SettingsSource::default());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    rpc::serve(&dispatcher, stdin, std::io::stdout()).await?;

    tracing::info!("sfdev-rpc stopped");
    Ok(())
}
