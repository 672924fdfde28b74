//! `schedbridge-server`: serves the scheduler tools as JSON-RPC over HTTP.

use anyhow::Result;
use clap::Parser;
use schedbridge::bridge::SchedulerBridge;
use schedbridge::config::Config;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "schedbridge-server", version, about = "Meeting scheduler tool server")]
struct Args {
    #[arg(long, help = "Address to bind, e.g. 0.0.0.0:8001")]
    bind: Option<String>,

    #[arg(long, help = "Scheduling store API base URL")]
    store_url: Option<String>,

    #[arg(long, env = "SCHEDBRIDGE_CONFIG", help = "Extra config file, applied last")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    schedbridge::logging::init("info");
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(url) = args.store_url {
        config.store.base_url = url;
    }

    let bridge = SchedulerBridge::new(&config.store.base_url, config.store.timeout())?;
    schedbridge::mcp::server::serve(&config.server.bind, bridge).await
}
