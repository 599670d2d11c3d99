//! SpecForge node binary.

use specforge_node::{init_tracing, run_server, NodeConfig};
use specforge_pipeline::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = NodeConfig::from_env()?;
    run_server(config, CancellationToken::new()).await
}
