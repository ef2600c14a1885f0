use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paxos_log::http::HttpRouter;
use paxos_log::{server, Node, ReplicatedLog};

#[derive(Debug, Parser)]
#[command(about = "Paxos participant: single-decree instance or replicated log")]
struct Args {
    /// This node's index into the peer list.
    #[arg(long)]
    node_id: i64,

    /// Address to bind the HTTP server on.
    #[arg(long)]
    listen: SocketAddr,

    /// Base URLs of every participant in node-id order, self included.
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Serve the replicated log instead of a single instance.
    #[arg(long)]
    log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let num_nodes = args.peers.len();

    let app = if args.log {
        let make_router = HttpRouter::factory(args.peers)?;
        let log = Arc::new(ReplicatedLog::new(args.node_id, num_nodes, make_router));
        server::log_app(log)
    } else {
        let router = Arc::new(HttpRouter::new(args.peers)?);
        let node = Arc::new(Node::new(args.node_id, num_nodes, router));
        server::node_app(node)
    };

    info!(node_id = args.node_id, listen = %args.listen, log = args.log, "serving");
    axum::Server::bind(&args.listen)
        .serve(app.into_make_service())
        .await
        .context("running http server")?;

    Ok(())
}
