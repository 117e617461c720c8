//! Server configuration and command-line arguments

use std::time::Duration;

use clap::{Parser, ValueEnum};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SESSION_PORT: u16 = 8080;
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// How much the server trusts a submitted move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MovePolicy {
    /// Check turn order and cell emptiness, compute the board server-side
    #[default]
    Validated,
    /// Accept the client's board snapshot as-is; last writer wins
    Trusted,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub move_policy: MovePolicy,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    /// Capacity of the coordinator command queue
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_SESSION_PORT,
            move_policy: MovePolicy::default(),
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Two-player tic-tac-toe room server
#[derive(Parser, Debug)]
#[command(name = "tictac-rooms")]
#[command(about = "WebSocket room server for two-player tic-tac-toe", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind to
    #[arg(short, long, default_value_t = DEFAULT_SESSION_PORT)]
    pub port: u16,

    /// Move validation policy
    #[arg(long, value_enum, default_value_t = MovePolicy::Validated)]
    pub move_policy: MovePolicy,

    /// Seconds between keepalive pings
    #[arg(long, default_value_t = DEFAULT_PING_INTERVAL.as_secs())]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before disconnecting
    #[arg(long, default_value_t = DEFAULT_PONG_TIMEOUT.as_secs())]
    pub pong_timeout_secs: u64,

    /// Capacity of the coordinator command queue
    #[arg(long, default_value_t = DEFAULT_COMMAND_BUFFER)]
    pub command_buffer: usize,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            move_policy: cli.move_policy,
            ping_interval: Duration::from_secs(cli.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(cli.pong_timeout_secs.max(1)),
            command_buffer: cli.command_buffer.max(1),
        }
    }
}
