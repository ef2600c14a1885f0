//! Replicated log built from one single-decree instance per slot.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::message::{
    LogRequest, NodeId, PrepareRequest, PrepareResponse, ProposeRequest, ProposeResponse, Value,
};
use crate::node::Node;
use crate::router::Router;

/// Builds the router a slot's roles send through. The slot index is baked
/// into the router so peers dispatch the message to the same slot.
pub type RouterFactory = Box<dyn Fn(u64) -> Arc<dyn Router> + Send + Sync>;

/// What actually goes through consensus for one appended value.
///
/// The `(node_id, line)` pair keeps entries from different writers (and
/// successive appends by one writer) distinct at the protocol layer, so the
/// "did my entry win this slot" comparison cannot confuse two submissions
/// of the same client value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LogEntry {
    node_id: NodeId,
    line: u64,
    value: Value,
}

/// Append-only ordered log agreed across all participants.
///
/// Slots are grown lazily: a client append always opens a fresh slot at the
/// end, and an internal RPC naming a slot this node has not seen yet grows
/// the vector up to it. Growth is deterministic, so independently-grown
/// logs stay index-compatible.
pub struct ReplicatedLog {
    node_id: NodeId,
    num_nodes: usize,
    make_router: RouterFactory,
    slots: Mutex<Vec<Arc<Node>>>,

    /// Local append cursor, advanced once per successful `propose`.
    line: Mutex<u64>,
}

impl ReplicatedLog {
    pub fn new(node_id: NodeId, num_nodes: usize, make_router: RouterFactory) -> Self {
        Self {
            node_id,
            num_nodes,
            make_router,
            slots: Mutex::new(Vec::new()),
            line: Mutex::new(0),
        }
    }

    /// The instance at `index`, growing the log up to it if needed.
    async fn slot(&self, index: u64) -> Arc<Node> {
        let mut slots = self.slots.lock().await;
        while slots.len() <= index as usize {
            let next = slots.len() as u64;
            slots.push(Arc::new(Node::new(
                self.node_id,
                self.num_nodes,
                (self.make_router)(next),
            )));
        }
        Arc::clone(&slots[index as usize])
    }

    /// Open a fresh slot at the end of the log.
    async fn append_slot(&self) -> (u64, Arc<Node>) {
        let mut slots = self.slots.lock().await;
        let index = slots.len() as u64;
        slots.push(Arc::new(Node::new(
            self.node_id,
            self.num_nodes,
            (self.make_router)(index),
        )));
        (index, Arc::clone(&slots[index as usize]))
    }

    async fn snapshot(&self) -> Vec<Arc<Node>> {
        self.slots.lock().await.clone()
    }

    /// Append `value` to the log and return the committed prefix.
    ///
    /// There is no leader election for slot placement: each attempt opens
    /// the next candidate slot and runs the single-decree protocol on it.
    /// Losing a slot to a competing writer just means trying the next one
    /// with the same entry. Blocks until the entry is placed.
    pub async fn propose(&self, value: Value) -> Result<Vec<Value>> {
        let line = *self.line.lock().await;
        let entry = serde_json::to_string(&LogEntry {
            node_id: self.node_id,
            line,
            value,
        })
        .context("encoding log entry")?;

        loop {
            let (index, slot) = self.append_slot().await;
            let committed = slot.propose(entry.clone()).await;
            if committed == entry {
                debug!(node_id = self.node_id, slot = index, "entry placed");
                break;
            }
            debug!(
                node_id = self.node_id,
                slot = index,
                "slot won by a competing entry, retrying on a later slot",
            );
        }
        *self.line.lock().await += 1;

        let mut prefix = Vec::new();
        for slot in self.snapshot().await {
            match slot.committed().await {
                Some(entry) => prefix.push(decode_entry(&entry)?),
                None => break,
            }
        }
        Ok(prefix)
    }

    /// Committed value of every slot, in order; `None` for open slots.
    pub async fn read(&self) -> Result<Vec<Option<Value>>> {
        let mut values = Vec::new();
        for slot in self.snapshot().await {
            values.push(match slot.committed().await {
                Some(entry) => Some(decode_entry(&entry)?),
                None => None,
            });
        }
        Ok(values)
    }

    pub async fn handle_prepare(
        &self,
        slot: u64,
        request: PrepareRequest,
    ) -> Option<PrepareResponse> {
        self.slot(slot).await.handle_prepare(request).await
    }

    pub async fn handle_propose(
        &self,
        slot: u64,
        request: ProposeRequest,
    ) -> Option<ProposeResponse> {
        self.slot(slot).await.handle_propose(request).await
    }

    pub async fn handle_log(&self, slot: u64, request: LogRequest) {
        self.slot(slot).await.handle_log(request).await;
    }
}

fn decode_entry(entry: &str) -> Result<Value> {
    let entry: LogEntry =
        serde_json::from_str(entry).context("decoding committed log entry")?;
    Ok(entry.value)
}
