use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::message::{is_majority, LogRequest, NodeId, Proposal, Value};

/// Passive Paxos role: counts acceptance announcements and commits once a
/// strict majority of acceptors has accepted one proposal.
pub struct Learner {
    /// Identity of the node hosting this learner.
    node_id: NodeId,

    /// Size of the acceptor group; the quorum denominator.
    num_acceptors: usize,

    /// Vote sets, keyed by the full proposal (id and value), so two
    /// proposals carrying the same value are tracked independently until
    /// one of them reaches quorum. Dropped once committed.
    received: Option<HashMap<Proposal, HashSet<NodeId>>>,

    /// The decided value. Set exactly once, never reset.
    committed: Option<Value>,
}

impl Learner {
    pub fn new(node_id: NodeId, num_acceptors: usize) -> Self {
        Self {
            node_id,
            num_acceptors,
            received: Some(HashMap::new()),
            committed: None,
        }
    }

    /// Count one acceptance announcement. Duplicate and late announcements
    /// are no-ops.
    pub fn handle_log(&mut self, request: LogRequest) {
        if self.committed.is_some() {
            return;
        }

        let received = self.received.get_or_insert_with(HashMap::new);
        let votes = received.entry(request.proposal.clone()).or_default();
        votes.insert(request.sender);

        if !is_majority(self.num_acceptors, votes.len()) {
            return;
        }

        info!(
            node_id = self.node_id,
            proposal_id = %request.proposal.id,
            value = %request.proposal.value,
            "committed",
        );
        self.committed = Some(request.proposal.value);
        self.received = None;
    }

    /// Commit directly, bypassing vote counting.
    ///
    /// Used by the proposing node once `propose_once` has itself observed a
    /// majority of acceptances. A value that already arrived through the
    /// announcement path wins; commitment is immutable.
    pub fn commit(&mut self, value: Value) {
        if self.committed.is_some() {
            return;
        }
        self.committed = Some(value);
        self.received = None;
    }

    pub fn committed(&self) -> Option<&Value> {
        self.committed.as_ref()
    }
}
