//! In-memory cluster harness: nodes wired through a router that can drop
//! deliveries or take whole peers down, no HTTP involved.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use paxos_log::log::RouterFactory;
use paxos_log::message::{NodeId, Request, Response};
use paxos_log::{Node, ReplicatedLog, Router};

/// Shared fault state for one test cluster.
pub struct ClusterState {
    nodes: Mutex<Vec<Arc<Node>>>,
    down: Mutex<HashSet<NodeId>>,
    drop_rate: f64,
    rng: Mutex<StdRng>,
}

impl ClusterState {
    /// Make a peer unreachable for the rest of the test.
    pub fn take_down(&self, node_id: NodeId) {
        self.down.lock().unwrap().insert(node_id);
    }

    fn drops(&self, to: NodeId) -> bool {
        if self.down.lock().unwrap().contains(&to) {
            return true;
        }
        self.drop_rate > 0.0 && self.rng.lock().unwrap().random_bool(self.drop_rate)
    }
}

struct MemoryRouter {
    cluster: Arc<ClusterState>,
}

#[async_trait]
impl Router for MemoryRouter {
    async fn send(&self, to: NodeId, request: Request) -> Option<Response> {
        if self.cluster.drops(to) {
            return None;
        }
        let node = {
            let nodes = self.cluster.nodes.lock().unwrap();
            Arc::clone(nodes.get(usize::try_from(to).ok()?)?)
        };
        match request {
            Request::Prepare(request) => node.handle_prepare(request).await.map(Response::Prepare),
            Request::Propose(request) => node.handle_propose(request).await.map(Response::Propose),
            Request::Log(request) => {
                node.handle_log(request).await;
                None
            }
        }
    }
}

/// `n` single-slot nodes delivering to each other in memory. Deliveries to
/// down peers always fail; others fail with `drop_rate` probability, drawn
/// from a rng seeded with `seed`.
pub fn cluster(n: usize, drop_rate: f64, seed: u64) -> (Vec<Arc<Node>>, Arc<ClusterState>) {
    let state = Arc::new(ClusterState {
        nodes: Mutex::new(Vec::new()),
        down: Mutex::new(HashSet::new()),
        drop_rate,
        rng: Mutex::new(StdRng::seed_from_u64(seed)),
    });

    let mut nodes = Vec::new();
    for node_id in 0..n as NodeId {
        let router = Arc::new(MemoryRouter {
            cluster: Arc::clone(&state),
        }) as Arc<dyn Router>;
        let node = Arc::new(Node::new(node_id, n, router));
        state.nodes.lock().unwrap().push(Arc::clone(&node));
        nodes.push(node);
    }
    (nodes, state)
}

struct LogClusterState {
    logs: Mutex<Vec<Arc<ReplicatedLog>>>,
}

struct MemoryLogRouter {
    cluster: Arc<LogClusterState>,
    slot: u64,
}

#[async_trait]
impl Router for MemoryLogRouter {
    async fn send(&self, to: NodeId, request: Request) -> Option<Response> {
        let log = {
            let logs = self.cluster.logs.lock().unwrap();
            Arc::clone(logs.get(usize::try_from(to).ok()?)?)
        };
        match request {
            Request::Prepare(request) => log
                .handle_prepare(self.slot, request)
                .await
                .map(Response::Prepare),
            Request::Propose(request) => log
                .handle_propose(self.slot, request)
                .await
                .map(Response::Propose),
            Request::Log(request) => {
                log.handle_log(self.slot, request).await;
                None
            }
        }
    }
}

/// `n` replicated-log nodes; each slot's router carries the slot index so
/// peers dispatch (and lazily grow) to the same slot.
pub fn log_cluster(n: usize) -> Vec<Arc<ReplicatedLog>> {
    let state = Arc::new(LogClusterState {
        logs: Mutex::new(Vec::new()),
    });

    let mut logs = Vec::new();
    for node_id in 0..n as NodeId {
        let factory_state = Arc::clone(&state);
        let make_router: RouterFactory = Box::new(move |slot| {
            Arc::new(MemoryLogRouter {
                cluster: Arc::clone(&factory_state),
                slot,
            }) as Arc<dyn Router>
        });
        let log = Arc::new(ReplicatedLog::new(node_id, n, make_router));
        state.logs.lock().unwrap().push(Arc::clone(&log));
        logs.push(log);
    }
    logs
}

/// Route test logs through the subscriber so `RUST_LOG` works under
/// `cargo test`.
pub fn init_tracing() -> impl Sized {
    use tracing::Dispatch;
    use tracing_subscriber::{fmt, EnvFilter};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .finish();
    tracing::dispatcher::set_default(&Dispatch::new(subscriber))
}
