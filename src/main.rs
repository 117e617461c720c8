use clap::Parser;
use tictac_rooms::config::{Cli, ServerConfig};
use tictac_rooms::session::SessionServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from(Cli::parse());

    println!("   Tic-tac-toe Room Server");
    println!("   Binding to {}", config.bind_addr());
    println!("   Move policy: {:?}", config.move_policy);
    println!("   Press Ctrl+C to stop\n");

    let server = SessionServer::bind(&config).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
