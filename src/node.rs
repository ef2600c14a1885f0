use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::acceptor::Acceptor;
use crate::learner::Learner;
use crate::message::{
    LogRequest, NodeId, PrepareRequest, PrepareResponse, ProposeRequest, ProposeResponse, Value,
};
use crate::proposer::Proposer;
use crate::router::Router;

/// First retry delay after a failed attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(150);

/// Backoff doubles after every failed attempt up to this cap.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// One Paxos instance: a proposer, an acceptor, and a learner sharing one
/// router.
///
/// Each role sits behind its own lock so concurrent inbound RPCs touching
/// different roles never contend, and per-role state is only ever mutated
/// under that role's lock.
pub struct Node {
    node_id: NodeId,
    proposer: Mutex<Proposer>,
    acceptor: Mutex<Acceptor>,
    learner: Mutex<Learner>,
}

impl Node {
    /// Build the instance for a group of `num_nodes` participants with ids
    /// `0..num_nodes`. Construction is deterministic in its arguments:
    /// every participant building slot state from the same arguments gets
    /// a structurally identical instance.
    pub fn new(node_id: NodeId, num_nodes: usize, router: Arc<dyn Router>) -> Self {
        let group: Vec<NodeId> = (0..num_nodes as NodeId).collect();
        Self {
            node_id,
            proposer: Mutex::new(Proposer::new(node_id, group.clone(), Arc::clone(&router))),
            acceptor: Mutex::new(Acceptor::new(node_id, group, router)),
            learner: Mutex::new(Learner::new(node_id, num_nodes)),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Drive the instance until some value is committed, then return it.
    ///
    /// Retries `propose_once` with exponential backoff; the caller's value
    /// is re-proposed on every attempt. The committed value may differ from
    /// `value` if another proposer won the instance first. Never errors:
    /// the only exit is commitment.
    pub async fn propose(&self, value: Value) -> Value {
        let mut wait = INITIAL_BACKOFF;
        loop {
            if let Some(committed) = self.committed().await {
                return committed;
            }

            let outcome = self
                .proposer
                .lock()
                .await
                .propose_once(value.clone())
                .await;
            if let Some(agreed) = outcome {
                // A majority already accepted; commit locally without
                // waiting for our own learner to count announcements.
                let mut learner = self.learner.lock().await;
                learner.commit(agreed);
                if let Some(committed) = learner.committed() {
                    return committed.clone();
                }
            }

            if let Some(committed) = self.committed().await {
                return committed;
            }

            debug!(node_id = self.node_id, backoff = ?wait, "attempt failed, retrying");
            sleep(wait).await;
            wait = (wait * 2).min(MAX_BACKOFF);
        }
    }

    /// Read-only snapshot of the learner's decision.
    pub async fn committed(&self) -> Option<Value> {
        self.learner.lock().await.committed().cloned()
    }

    pub async fn handle_prepare(&self, request: PrepareRequest) -> Option<PrepareResponse> {
        self.acceptor.lock().await.handle_prepare(request)
    }

    pub async fn handle_propose(&self, request: ProposeRequest) -> Option<ProposeResponse> {
        self.acceptor.lock().await.handle_propose(request).await
    }

    pub async fn handle_log(&self, request: LogRequest) {
        self.learner.lock().await.handle_log(request);
    }
}
